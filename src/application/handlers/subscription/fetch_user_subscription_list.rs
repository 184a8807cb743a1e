//! FetchUserSubscriptionListHandler - Query handler listing every grant a user
//! holds, with city names.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::SubscriptionError;
use crate::ports::SubscriptionReader;

use super::get_user_subscriptions_by_city::GrantStatus;

#[derive(Debug, Clone)]
pub struct FetchUserSubscriptionListQuery {
    pub user_id: UserId,
}

/// One row of the subscription list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitySubscription {
    pub city_name: String,
    #[serde(flatten)]
    pub status: GrantStatus,
}

pub type FetchUserSubscriptionListResult = Vec<CitySubscription>;

/// Handler for the user's subscription list.
///
/// Active grants come first, then by soonest expiry.
pub struct FetchUserSubscriptionListHandler {
    reader: Arc<dyn SubscriptionReader>,
}

impl FetchUserSubscriptionListHandler {
    pub fn new(reader: Arc<dyn SubscriptionReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: FetchUserSubscriptionListQuery,
    ) -> Result<FetchUserSubscriptionListResult, SubscriptionError> {
        let now = Timestamp::now();
        let mut rows: Vec<CitySubscription> = self
            .reader
            .grants_with_city_names(query.user_id)
            .await?
            .into_iter()
            .map(|row| CitySubscription {
                city_name: row.city_name,
                status: GrantStatus::at(row.grant, &now),
            })
            .collect();

        rows.sort_by(|a, b| {
            b.status
                .is_active
                .cmp(&a.status.is_active)
                .then(a.status.grant.expires_at.cmp(&b.status.grant.expires_at))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCatalog, InMemorySubscriptionReader, InMemorySubscriptionStore,
    };
    use crate::domain::catalog::{City, CityTier};
    use crate::domain::foundation::{CityId, PlanId};
    use crate::domain::subscription::NewSubscriptionGrant;

    #[tokio::test]
    async fn lists_active_first_with_city_names() {
        let store = InMemorySubscriptionStore::new();
        let catalog = InMemoryCatalog::new();
        let user_id = UserId::new(1).unwrap();
        for (id, name, days) in [(1, "Rasht", -10), (2, "Ahvaz", 60), (3, "Karaj", 5)] {
            let city_id = CityId::new(id).unwrap();
            catalog.add_city(City::new(city_id, name, CityTier::Ordinary));
            store
                .seed_grant(NewSubscriptionGrant::new(
                    user_id,
                    city_id,
                    PlanId::new(1).unwrap(),
                    Timestamp::now().add_days(days),
                ))
                .unwrap();
        }
        let reader = InMemorySubscriptionReader::new(store, catalog);
        let handler = FetchUserSubscriptionListHandler::new(Arc::new(reader));

        let rows = handler
            .handle(FetchUserSubscriptionListQuery { user_id })
            .await
            .unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.city_name.as_str()).collect();
        assert_eq!(names, vec!["Karaj", "Ahvaz", "Rasht"]);
        assert!(!rows[2].status.is_active);
    }

    #[test]
    fn row_serializes_flat() {
        let grant = NewSubscriptionGrant::new(
            UserId::new(1).unwrap(),
            CityId::new(2).unwrap(),
            PlanId::new(3).unwrap(),
            Timestamp::now().add_days(1),
        )
        .with_id(crate::domain::foundation::GrantId::new(9).unwrap());
        let row = CitySubscription {
            city_name: "Rasht".into(),
            status: GrantStatus::at(grant, &Timestamp::now()),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["city_name"], "Rasht");
        assert_eq!(json["is_active"], true);
        assert_eq!(json["grant"]["id"], 9);
    }
}
