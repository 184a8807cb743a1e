//! HTTP DTOs for subscription endpoints.
//!
//! Ids arrive as raw integers and are validated into typed ids by the
//! handlers, so a zero or negative id is a 400 rather than a deserialization
//! failure.

use serde::{Deserialize, Serialize};

use crate::application::handlers::subscription::{
    CitySubscription, CreateUserSubscriptionResult, FetchPaymentGatewayInfoResult, GrantStatus,
};
use crate::domain::subscription::{LedgerEntry, SubscriptionGrant};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to open a charge for a city subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenChargeRequest {
    pub city_id: i64,
    pub plan_id: i64,
    /// Where the gateway sends the payer back after paying.
    pub callback_url: String,
}

/// Request to confirm a paid charge.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmChargeRequest {
    pub authority: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct OpenChargeResponse {
    /// Gateway page the client should redirect the payer to.
    pub redirect_url: String,
    pub authority: String,
    pub amount: i64,
}

impl From<FetchPaymentGatewayInfoResult> for OpenChargeResponse {
    fn from(result: FetchPaymentGatewayInfoResult) -> Self {
        Self {
            redirect_url: result.redirect_url,
            authority: result.authority.as_str().to_string(),
            amount: result.amount,
        }
    }
}

/// A grant as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct GrantResponse {
    pub id: i64,
    pub city_id: i64,
    pub plan_id: i64,
    /// ISO 8601.
    pub expires_at: String,
    pub created_at: String,
}

impl From<&SubscriptionGrant> for GrantResponse {
    fn from(grant: &SubscriptionGrant) -> Self {
        Self {
            id: grant.id.as_i64(),
            city_id: grant.city_id.as_i64(),
            plan_id: grant.plan_id.as_i64(),
            expires_at: grant.expires_at.as_datetime().to_rfc3339(),
            created_at: grant.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// A ledger entry as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub city_id: i64,
    pub amount: i64,
    pub reference_id: String,
    pub authority: String,
    pub period_months: i32,
    pub created_at: String,
}

impl From<&LedgerEntry> for TransactionResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.as_i64(),
            city_id: entry.city_id.as_i64(),
            amount: entry.amount,
            reference_id: entry.reference_id.clone(),
            authority: entry.authority.as_str().to_string(),
            period_months: entry.period.months(),
            created_at: entry.created_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmChargeResponse {
    pub subscription: GrantResponse,
    pub transaction: TransactionResponse,
    pub first_purchase: bool,
}

impl From<CreateUserSubscriptionResult> for ConfirmChargeResponse {
    fn from(result: CreateUserSubscriptionResult) -> Self {
        Self {
            subscription: GrantResponse::from(&result.grant),
            transaction: TransactionResponse::from(&result.ledger_entry),
            first_purchase: result.first_purchase,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantStatusResponse {
    #[serde(flatten)]
    pub grant: GrantResponse,
    pub is_active: bool,
    pub days_remaining: u32,
}

impl From<&GrantStatus> for GrantStatusResponse {
    fn from(status: &GrantStatus) -> Self {
        Self {
            grant: GrantResponse::from(&status.grant),
            is_active: status.is_active,
            days_remaining: status.days_remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CitySubscriptionResponse {
    pub city_name: String,
    #[serde(flatten)]
    pub status: GrantStatusResponse,
}

impl From<&CitySubscription> for CitySubscriptionResponse {
    fn from(row: &CitySubscription) -> Self {
        Self {
            city_name: row.city_name.clone(),
            status: GrantStatusResponse::from(&row.status),
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
