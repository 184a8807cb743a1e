//! In-memory subscription reader over the in-memory store and catalog.

use async_trait::async_trait;

use crate::domain::foundation::{CityId, DomainError, UserId};
use crate::domain::subscription::{LedgerEntry, SubscriptionGrant};
use crate::ports::{GrantWithCityName, SubscriptionReader};

use super::{InMemoryCatalog, InMemorySubscriptionStore};

/// Read projections over committed in-memory state.
#[derive(Clone)]
pub struct InMemorySubscriptionReader {
    store: InMemorySubscriptionStore,
    catalog: InMemoryCatalog,
}

impl InMemorySubscriptionReader {
    pub fn new(store: InMemorySubscriptionStore, catalog: InMemoryCatalog) -> Self {
        Self { store, catalog }
    }
}

#[async_trait]
impl SubscriptionReader for InMemorySubscriptionReader {
    async fn grants_for_user_by_city(
        &self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Vec<SubscriptionGrant>, DomainError> {
        Ok(self.store.grants_for(user_id, city_id))
    }

    async fn transaction_history(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, DomainError> {
        let mut entries: Vec<LedgerEntry> = self
            .store
            .ledger_entries()
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn grants_with_city_names(
        &self,
        user_id: UserId,
    ) -> Result<Vec<GrantWithCityName>, DomainError> {
        // Inner-join semantics: grants whose city is gone are skipped.
        Ok(self
            .store
            .all_grants()
            .into_iter()
            .filter(|g| g.user_id == user_id)
            .filter_map(|grant| {
                self.catalog
                    .city_name(grant.city_id)
                    .map(|city_name| GrantWithCityName { grant, city_name })
            })
            .collect())
    }
}
