//! In-memory catalog for tests and local development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::catalog::{City, CityTier, SubscriptionPlan, UserProfile};
use crate::domain::foundation::{CityId, DomainError, PlanId, UserId};
use crate::ports::CatalogReader;

/// In-memory `CatalogReader` seeded by the caller.
///
/// Clones share the same data, so a test can keep a handle and edit the
/// catalog while handlers hold another.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    inner: Arc<RwLock<CatalogState>>,
}

#[derive(Default)]
struct CatalogState {
    plans: HashMap<PlanId, SubscriptionPlan>,
    cities: HashMap<CityId, City>,
    users: HashMap<UserId, UserProfile>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plan(&self, plan: SubscriptionPlan) {
        self.write().plans.insert(plan.id, plan);
    }

    pub fn add_city(&self, city: City) {
        self.write().cities.insert(city.id, city);
    }

    pub fn add_user(&self, user: UserProfile) {
        self.write().users.insert(user.id, user);
    }

    /// Change a city's tier in place, as an administrator would.
    pub fn set_city_tier(&self, id: CityId, tier: CityTier) {
        if let Some(city) = self.write().cities.get_mut(&id) {
            city.tier = tier;
        }
    }

    pub fn remove_plan(&self, id: PlanId) {
        self.write().plans.remove(&id);
    }

    /// City display name, if the city exists.
    pub fn city_name(&self, id: CityId) -> Option<String> {
        self.read().cities.get(&id).map(|c| c.name.clone())
    }

    // A poisoned lock still holds consistent maps: every write is a single insert.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, CatalogState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CatalogState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn find_plan(&self, id: PlanId) -> Result<Option<SubscriptionPlan>, DomainError> {
        Ok(self.read().plans.get(&id).cloned())
    }

    async fn find_city(&self, id: CityId) -> Result<Option<City>, DomainError> {
        Ok(self.read().cities.get(&id).cloned())
    }

    async fn find_user_profile(&self, id: UserId) -> Result<Option<UserProfile>, DomainError> {
        Ok(self.read().users.get(&id).cloned())
    }
}
