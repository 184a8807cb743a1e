//! Payment gateway port for external charge processing.
//!
//! The gateway opens a charge and hands back a redirect URL plus an authority
//! token; after the user pays, the same token and amount are used to verify
//! the charge.
//!
//! # Design
//!
//! - **Gateway agnostic**: No wire format leaks through this interface
//! - **Blocking boundary**: Both calls cross the network; callers bound them
//!   with a timeout and never hold locks other than their DB transaction
//! - **No retries here**: Callers decide whether to retry

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::AuthorityToken;
use crate::domain::subscription::GatewayError;

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a charge for `amount` and return where to send the user.
    async fn open_charge(&self, request: OpenChargeRequest) -> Result<OpenedCharge, GatewayError>;

    /// Verify a previously opened charge.
    ///
    /// `Ok` means the gateway answered; the outcome says whether money moved.
    /// `Err` means the answer is unknown (transport failure, garbage, timeout).
    async fn verify_charge(
        &self,
        amount: i64,
        authority: &AuthorityToken,
    ) -> Result<VerifyOutcome, GatewayError>;
}

/// Request to open a charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenChargeRequest {
    /// Amount in the smallest currency unit.
    pub amount: i64,

    /// Where the gateway sends the user after payment.
    pub callback_url: String,

    /// Free-text description shown on the gateway page.
    pub description: String,
}

/// A charge the gateway has opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedCharge {
    /// URL the user must visit to pay.
    pub redirect_url: String,

    /// Gateway handle for this charge.
    pub authority: AuthorityToken,
}

/// Definitive gateway answer to a verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyOutcome {
    /// Payment captured for the first time.
    Verified { reference_id: String },

    /// The gateway had already verified this authority earlier.
    AlreadyVerified { reference_id: String },

    /// The gateway refused verification (unpaid, cancelled, amount mismatch).
    Rejected { code: i32, message: String },
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyOutcome::Verified { .. })
    }
}
