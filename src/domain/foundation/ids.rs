//! Strongly-typed identifier value objects.
//!
//! Every row id in the back office is a positive 64-bit integer assigned by the
//! database. Zero and negative values never identify a row, so construction
//! rejects them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new id, rejecting non-positive values.
            pub fn new(id: i64) -> Result<Self, ValidationError> {
                if id <= 0 {
                    return Err(ValidationError::invalid_format($field, "must be positive"));
                }
                Ok(Self(id))
            }

            /// Returns the raw database value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| ValidationError::invalid_format($field, e.to_string()))?;
                Self::new(raw)
            }
        }
    };
}

define_id!(
    /// Identifier of a back-office user.
    UserId,
    "user_id"
);

define_id!(
    /// Identifier of a city whose listings can be unlocked.
    CityId,
    "city_id"
);

define_id!(
    /// Identifier of a subscription plan in the catalog.
    PlanId,
    "plan_id"
);

define_id!(
    /// Identifier of a subscription grant.
    GrantId,
    "grant_id"
);

define_id!(
    /// Identifier of a payment ledger entry.
    LedgerEntryId,
    "ledger_entry_id"
);

/// Opaque token issued by the payment gateway for one charge attempt.
///
/// The gateway is the only issuer; the backend never mints these outside tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorityToken(String);

impl AuthorityToken {
    /// Creates a token, rejecting blank values.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ValidationError::empty_field("authority"));
        }
        Ok(Self(token))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
