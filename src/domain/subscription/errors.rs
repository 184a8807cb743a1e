//! Subscription workflow error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | CallbackUrlMissing | 400 |
//! | InvalidInput | 400 |
//! | AlreadySubscribedForCity | 409 |
//! | InvalidPlan / InvalidCity / UserNotFound | 404 |
//! | InvalidOrConsumedAuthority | 409 |
//! | DataMismatch | 403 |
//! | PaymentAlreadyVerified / PaymentRejected / PaymentFailed | 402 |
//! | Gateway | 502 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{CityId, DomainError, ErrorCode, PlanId, UserId, ValidationError};

/// Failures reported by the payment gateway client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway did not answer within the configured timeout.
    #[error("gateway did not respond within {after_secs}s")]
    Timeout { after_secs: u64 },

    /// Connection, TLS or HTTP-level failure.
    #[error("gateway transport failure: {0}")]
    Transport(String),

    /// The gateway answered and refused the request.
    #[error("gateway refused request (code {code}): {message}")]
    Refused { code: i32, message: String },

    /// The gateway answered with something we could not interpret.
    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. } | GatewayError::Transport(_))
    }
}

/// Errors returned by the purchase and confirmation workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("A callback URL is required")]
    CallbackUrlMissing,

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("User {user_id} already holds an active subscription for city {city_id}")]
    AlreadySubscribedForCity { user_id: UserId, city_id: CityId },

    #[error("Subscription plan {0} does not exist")]
    InvalidPlan(PlanId),

    #[error("City {0} does not exist")]
    InvalidCity(CityId),

    #[error("User {0} does not exist")]
    UserNotFound(UserId),

    #[error("Payment authority is invalid or has already been used")]
    InvalidOrConsumedAuthority,

    #[error("Payment data does not match this request")]
    DataMismatch,

    #[error("Payment has already been verified")]
    PaymentAlreadyVerified,

    #[error("Payment verification was rejected (code {code})")]
    PaymentRejected { code: i32 },

    #[error("Payment failed")]
    PaymentFailed,

    #[error("Payment gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SubscriptionError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::CallbackUrlMissing => ErrorCode::CallbackUrlMissing,
            SubscriptionError::InvalidInput { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::AlreadySubscribedForCity { .. } => ErrorCode::AlreadySubscribed,
            SubscriptionError::InvalidPlan(_) => ErrorCode::PlanNotFound,
            SubscriptionError::InvalidCity(_) => ErrorCode::CityNotFound,
            SubscriptionError::UserNotFound(_) => ErrorCode::UserNotFound,
            SubscriptionError::InvalidOrConsumedAuthority => ErrorCode::InvalidOrConsumedAuthority,
            SubscriptionError::DataMismatch => ErrorCode::DataMismatch,
            SubscriptionError::PaymentAlreadyVerified => ErrorCode::PaymentAlreadyVerified,
            SubscriptionError::PaymentRejected { .. } => ErrorCode::PaymentRejected,
            SubscriptionError::PaymentFailed => ErrorCode::PaymentFailed,
            SubscriptionError::Gateway(_) => ErrorCode::GatewayError,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Whether the same request may succeed if sent again unchanged.
    ///
    /// Confirmation failures are never retryable: the authority token is gone.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubscriptionError::Gateway(e) => e.is_retryable(),
            SubscriptionError::Infrastructure(_) => true,
            _ => false,
        }
    }

    /// Whether this is an operational failure worth an error log, as opposed
    /// to an expected business outcome.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            SubscriptionError::Infrastructure(_) | SubscriptionError::PaymentFailed
        )
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        SubscriptionError::InvalidInput {
            field,
            reason: err.to_string(),
        }
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => SubscriptionError::InvalidInput {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                reason: err.message,
            },
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        assert_eq!(SubscriptionError::CallbackUrlMissing.code(), ErrorCode::CallbackUrlMissing);
        assert_eq!(
            SubscriptionError::InvalidOrConsumedAuthority.code(),
            ErrorCode::InvalidOrConsumedAuthority
        );
        assert_eq!(SubscriptionError::DataMismatch.code(), ErrorCode::DataMismatch);
        assert_eq!(
            SubscriptionError::PaymentRejected { code: -51 }.code(),
            ErrorCode::PaymentRejected
        );
        assert_eq!(
            SubscriptionError::infrastructure("db down").code(),
            ErrorCode::DatabaseError
        );
    }

    #[test]
    fn already_subscribed_message_names_user_and_city() {
        let err = SubscriptionError::AlreadySubscribedForCity {
            user_id: UserId::new(5).unwrap(),
            city_id: CityId::new(8).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('8'));
    }

    #[test]
    fn payment_failed_hides_cause() {
        assert_eq!(SubscriptionError::PaymentFailed.to_string(), "Payment failed");
    }

    #[test]
    fn only_gateway_transport_and_infrastructure_are_retryable() {
        assert!(SubscriptionError::Gateway(GatewayError::Timeout { after_secs: 10 }).is_retryable());
        assert!(SubscriptionError::Gateway(GatewayError::Transport("reset".into())).is_retryable());
        assert!(!SubscriptionError::Gateway(GatewayError::Refused {
            code: -9,
            message: "bad merchant".into()
        })
        .is_retryable());
        assert!(SubscriptionError::infrastructure("timeout").is_retryable());
        assert!(!SubscriptionError::PaymentFailed.is_retryable());
        assert!(!SubscriptionError::InvalidOrConsumedAuthority.is_retryable());
    }

    #[test]
    fn operational_errors_are_persistence_and_unknown_gateway() {
        assert!(SubscriptionError::infrastructure("x").is_operational());
        assert!(SubscriptionError::PaymentFailed.is_operational());
        assert!(!SubscriptionError::PaymentAlreadyVerified.is_operational());
        assert!(!SubscriptionError::DataMismatch.is_operational());
    }

    #[test]
    fn database_domain_error_becomes_infrastructure() {
        let err: SubscriptionError = DomainError::database("connection reset").into();
        assert!(matches!(err, SubscriptionError::Infrastructure(ref m) if m.contains("connection reset")));
    }

    #[test]
    fn validation_domain_error_keeps_field() {
        let err: SubscriptionError = DomainError::validation("city_id", "must be positive").into();
        assert!(matches!(
            err,
            SubscriptionError::InvalidInput { ref field, .. } if field == "city_id"
        ));
    }

    #[test]
    fn converts_to_domain_error() {
        let domain: DomainError = SubscriptionError::DataMismatch.into();
        assert_eq!(domain.code, ErrorCode::DataMismatch);
    }
}
