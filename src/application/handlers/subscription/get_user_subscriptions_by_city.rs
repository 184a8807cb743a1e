//! GetUserSubscriptionsByCityHandler - Query handler for a user's grants in one city.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{CityId, Timestamp, UserId};
use crate::domain::subscription::{SubscriptionError, SubscriptionGrant};
use crate::ports::SubscriptionReader;

/// Query for the grants a user holds in one city.
#[derive(Debug, Clone)]
pub struct GetUserSubscriptionsByCityQuery {
    pub user_id: UserId,
    pub city_id: CityId,
}

/// A grant plus its state at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantStatus {
    pub grant: SubscriptionGrant,
    pub is_active: bool,
    pub days_remaining: u32,
}

impl GrantStatus {
    pub fn at(grant: SubscriptionGrant, now: &Timestamp) -> Self {
        Self {
            is_active: grant.is_active_at(now),
            days_remaining: grant.days_remaining_at(now),
            grant,
        }
    }
}

pub type GetUserSubscriptionsByCityResult = Vec<GrantStatus>;

/// Handler for a user's grants in one city (zero or one).
pub struct GetUserSubscriptionsByCityHandler {
    reader: Arc<dyn SubscriptionReader>,
}

impl GetUserSubscriptionsByCityHandler {
    pub fn new(reader: Arc<dyn SubscriptionReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetUserSubscriptionsByCityQuery,
    ) -> Result<GetUserSubscriptionsByCityResult, SubscriptionError> {
        let now = Timestamp::now();
        let grants = self
            .reader
            .grants_for_user_by_city(query.user_id, query.city_id)
            .await?;
        Ok(grants.into_iter().map(|g| GrantStatus::at(g, &now)).collect())
    }
}
