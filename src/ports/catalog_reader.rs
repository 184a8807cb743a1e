//! Catalog reader port.
//!
//! Read access to data owned by other back-office subsystems. Absence is
//! reported as `None`; callers decide whether that is a validation failure.

use async_trait::async_trait;

use crate::domain::catalog::{City, SubscriptionPlan, UserProfile};
use crate::domain::foundation::{CityId, DomainError, PlanId, UserId};

/// Reader port for plans, cities and user profiles.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Find a subscription plan by id.
    async fn find_plan(&self, id: PlanId) -> Result<Option<SubscriptionPlan>, DomainError>;

    /// Find a city by id.
    async fn find_city(&self, id: CityId) -> Result<Option<City>, DomainError>;

    /// Find a user profile by id.
    async fn find_user_profile(&self, id: UserId) -> Result<Option<UserProfile>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_reader_is_object_safe() {
        fn _accepts_dyn(_reader: &dyn CatalogReader) {}
    }
}
