//! Subscription domain module.
//!
//! Handles the two-phase city subscription purchase: pricing, pending purchases
//! awaiting gateway confirmation, access grants, and the payment ledger.
//!
//! # Module Structure
//!
//! - `pricing` - Tier-based price rule
//! - `pending_purchase` - Ephemeral record keyed by gateway authority
//! - `grant` - Per-(user, city) access grant and its expiry rule
//! - `ledger` - Append-only record of verified charges
//! - `errors` - Workflow and gateway error types

mod errors;
mod grant;
mod ledger;
mod pending_purchase;
mod pricing;

pub use errors::{GatewayError, SubscriptionError};
pub use grant::{grant_expiry, NewSubscriptionGrant, SubscriptionGrant, FIRST_PURCHASE_BONUS_DAYS};
pub use ledger::{LedgerEntry, NewLedgerEntry};
pub use pending_purchase::PendingPurchase;
pub use pricing::price;
