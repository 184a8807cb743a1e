//! Mock payment gateway for testing.
//!
//! Provides a configurable mock implementation of `PaymentGateway` for unit
//! and integration tests. Supports:
//! - Sequential authority tokens
//! - Scripted verification outcomes
//! - Error injection
//! - Artificial latency (for timeout tests)
//! - Call tracking

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::AuthorityToken;
use crate::domain::subscription::GatewayError;
use crate::ports::{OpenChargeRequest, OpenedCharge, PaymentGateway, VerifyOutcome};

/// Mock payment gateway for testing.
///
/// By default every charge opens and every verification succeeds with a
/// fresh reference id.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
///
/// // Script the next verification
/// gateway.push_verify_outcome(VerifyOutcome::AlreadyVerified { reference_id: "1".into() });
///
/// // Inject errors
/// gateway.fail_verify_with(GatewayError::Transport("connection reset".into()));
/// ```
#[derive(Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Counter used for authority tokens and reference ids.
    sequence: u64,

    /// Outcomes returned by upcoming `verify_charge` calls, in order.
    scripted_outcomes: VecDeque<VerifyOutcome>,

    /// Error returned by every `open_charge` call while set.
    open_error: Option<GatewayError>,

    /// Error returned by every `verify_charge` call while set.
    verify_error: Option<GatewayError>,

    /// Sleep before answering any call.
    delay: Option<Duration>,

    open_calls: Vec<OpenChargeRequest>,
    verify_calls: Vec<VerifyCall>,
}

/// Recorded `verify_charge` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCall {
    pub amount: i64,
    pub authority: AuthorityToken,
}

impl MockPaymentGateway {
    /// Create a mock gateway that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock gateway whose every call hangs for `delay`.
    pub fn slow(delay: Duration) -> Self {
        let mock = Self::new();
        mock.state().delay = Some(delay);
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Queue the outcome for the next verification.
    pub fn push_verify_outcome(&self, outcome: VerifyOutcome) {
        self.state().scripted_outcomes.push_back(outcome);
    }

    /// Make every `open_charge` fail with `error`.
    pub fn fail_open_with(&self, error: GatewayError) {
        self.state().open_error = Some(error);
    }

    /// Make every `verify_charge` fail with `error`.
    pub fn fail_verify_with(&self, error: GatewayError) {
        self.state().verify_error = Some(error);
    }

    /// Clear injected errors and scripted outcomes.
    pub fn reset(&self) {
        let mut state = self.state();
        state.open_error = None;
        state.verify_error = None;
        state.scripted_outcomes.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn open_calls(&self) -> Vec<OpenChargeRequest> {
        self.state().open_calls.clone()
    }

    pub fn verify_calls(&self) -> Vec<VerifyCall> {
        self.state().verify_calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn delay(&self) -> Option<Duration> {
        self.state().delay
    }
}

impl Clone for MockPaymentGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn open_charge(&self, request: OpenChargeRequest) -> Result<OpenedCharge, GatewayError> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.open_calls.push(request);

        if let Some(error) = state.open_error.clone() {
            return Err(error);
        }

        state.sequence += 1;
        let token = format!("A{:035}", state.sequence);
        let authority = AuthorityToken::new(token.clone())
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(OpenedCharge {
            redirect_url: format!("https://gateway.test/pay/{}", token),
            authority,
        })
    }

    async fn verify_charge(
        &self,
        amount: i64,
        authority: &AuthorityToken,
    ) -> Result<VerifyOutcome, GatewayError> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.verify_calls.push(VerifyCall {
            amount,
            authority: authority.clone(),
        });

        if let Some(error) = state.verify_error.clone() {
            return Err(error);
        }

        if let Some(outcome) = state.scripted_outcomes.pop_front() {
            return Ok(outcome);
        }

        state.sequence += 1;
        Ok(VerifyOutcome::Verified {
            reference_id: state.sequence.to_string(),
        })
    }
}
