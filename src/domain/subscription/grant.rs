//! Subscription grant entity.
//!
//! A grant is the durable record of one user's paid access to one city.
//!
//! # Invariants
//!
//! - At most one grant exists per `(user_id, city_id)`, expired or not
//! - A grant is never updated in place; a new purchase deletes the old row and
//!   inserts a fresh one in the same transaction
//! - A grant is active while `now < expires_at`

use serde::{Deserialize, Serialize};

use crate::domain::catalog::PlanPeriod;
use crate::domain::foundation::{CityId, GrantId, PlanId, Timestamp, UserId};

/// Bonus added to the first purchase a user ever makes for a given city.
pub const FIRST_PURCHASE_BONUS_DAYS: i64 = 15;

/// Persisted access grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionGrant {
    pub id: GrantId,
    pub user_id: UserId,
    pub city_id: CityId,
    pub plan_id: PlanId,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl SubscriptionGrant {
    /// Whether the grant still gives access at `now`.
    pub fn is_active_at(&self, now: &Timestamp) -> bool {
        now.is_before(&self.expires_at)
    }

    /// Whole days of access left at `now`, zero once expired.
    pub fn days_remaining_at(&self, now: &Timestamp) -> u32 {
        if !self.is_active_at(now) {
            return 0;
        }
        self.expires_at.duration_since(now).num_days().max(0) as u32
    }
}

/// Grant awaiting insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriptionGrant {
    pub user_id: UserId,
    pub city_id: CityId,
    pub plan_id: PlanId,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl NewSubscriptionGrant {
    pub fn new(user_id: UserId, city_id: CityId, plan_id: PlanId, expires_at: Timestamp) -> Self {
        Self {
            user_id,
            city_id,
            plan_id,
            expires_at,
            created_at: Timestamp::now(),
        }
    }

    /// Attaches the store-assigned id.
    pub fn with_id(self, id: GrantId) -> SubscriptionGrant {
        SubscriptionGrant {
            id,
            user_id: self.user_id,
            city_id: self.city_id,
            plan_id: self.plan_id,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

/// Computes when a newly purchased grant expires.
///
/// `now + period`, plus `bonus_days` if the user never held a grant for the
/// city before. Replacing an existing grant, even an expired one, earns no
/// bonus and does not carry over remaining time.
pub fn grant_expiry(
    now: Timestamp,
    period: PlanPeriod,
    first_purchase_for_city: bool,
    bonus_days: i64,
) -> Timestamp {
    let expires_at = now.add_days(period.duration_days());
    if first_purchase_for_city {
        expires_at.add_days(bonus_days)
    } else {
        expires_at
    }
}
