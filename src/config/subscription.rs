//! Subscription workflow configuration

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::maintenance::ReaperConfig;
use crate::domain::subscription::FIRST_PURCHASE_BONUS_DAYS;

use super::error::ValidationError;

/// Longest a pending purchase may live before the reaper deletes it.
pub const MAX_PENDING_PURCHASE_TTL_SECS: u64 = 30 * 86_400;

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Extra days on a user's first grant for a city
    #[serde(default = "default_bonus_days")]
    pub first_purchase_bonus_days: i64,

    /// Age after which an unconfirmed purchase is deleted
    #[serde(default = "default_ttl")]
    pub pending_purchase_ttl_secs: u64,

    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,

    #[serde(default = "default_true")]
    pub reaper_enabled: bool,
}

impl SubscriptionConfig {
    pub fn reaper_config(&self) -> ReaperConfig {
        ReaperConfig::default()
            .with_interval(Duration::from_secs(self.reaper_interval_secs))
            .with_ttl(Duration::from_secs(self.pending_purchase_ttl_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0..=365).contains(&self.first_purchase_bonus_days) {
            return Err(ValidationError::InvalidBonusDays);
        }
        if !(1..=MAX_PENDING_PURCHASE_TTL_SECS).contains(&self.pending_purchase_ttl_secs) {
            return Err(ValidationError::InvalidPendingPurchaseTtl);
        }
        if self.reaper_interval_secs == 0 {
            return Err(ValidationError::InvalidReaperSchedule);
        }
        Ok(())
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            first_purchase_bonus_days: default_bonus_days(),
            pending_purchase_ttl_secs: default_ttl(),
            reaper_interval_secs: default_reaper_interval(),
            reaper_enabled: true,
        }
    }
}

fn default_bonus_days() -> i64 {
    FIRST_PURCHASE_BONUS_DAYS
}

fn default_ttl() -> u64 {
    86_400
}

fn default_reaper_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}
