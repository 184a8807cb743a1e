//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, the timestamp value object, and error types
//! that form the vocabulary of the Citypass domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AuthorityToken, CityId, GrantId, LedgerEntryId, PlanId, UserId};
pub use timestamp::Timestamp;
