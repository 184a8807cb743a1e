//! Subscription reader port (read side / CQRS queries).
//!
//! Plain projections of grants and ledger entries. Implementations must read
//! the durable rows directly; grant expiry is checked against these results,
//! so no caching is allowed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CityId, DomainError, UserId};
use crate::domain::subscription::{LedgerEntry, SubscriptionGrant};

/// Reader port for subscription queries.
#[async_trait]
pub trait SubscriptionReader: Send + Sync {
    /// Grants a user holds for one city (zero or one row).
    async fn grants_for_user_by_city(
        &self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Vec<SubscriptionGrant>, DomainError>;

    /// The user's ledger entries, newest first.
    async fn transaction_history(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, DomainError>;

    /// Every grant the user holds, with the city's display name.
    async fn grants_with_city_names(
        &self,
        user_id: UserId,
    ) -> Result<Vec<GrantWithCityName>, DomainError>;
}

/// Grant joined with its city's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantWithCityName {
    pub grant: SubscriptionGrant,
    pub city_name: String,
}
