//! Pending purchase: the bridge between opening a charge and confirming it.
//!
//! One record exists per authority token from the moment the gateway opens a
//! charge until the record is claimed by a confirmation (successful or not) or
//! reaped for age. A token that resolves to nothing is indistinguishable between
//! never issued, already consumed, and expired.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthorityToken, CityId, PlanId, Timestamp, UserId};

/// Ephemeral record keyed by the gateway's authority token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPurchase {
    /// Gateway-issued key, unique per charge attempt.
    pub authority: AuthorityToken,

    /// User who opened the charge.
    pub user_id: UserId,

    /// City the user is buying access to.
    pub city_id: CityId,

    /// Plan the user picked.
    pub plan_id: PlanId,

    /// Amount the gateway charge was opened for.
    pub amount: i64,

    pub created_at: Timestamp,
}

impl PendingPurchase {
    pub fn new(
        authority: AuthorityToken,
        user_id: UserId,
        city_id: CityId,
        plan_id: PlanId,
        amount: i64,
    ) -> Self {
        Self {
            authority,
            user_id,
            city_id,
            plan_id,
            amount,
            created_at: Timestamp::now(),
        }
    }

    /// Whether `user_id` opened this purchase.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Whether the record was created strictly before `cutoff`.
    pub fn is_older_than(&self, cutoff: &Timestamp) -> bool {
        self.created_at.is_before(cutoff)
    }
}
