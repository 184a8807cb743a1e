//! PriceQuoter - Loads the catalog rows a purchase depends on and prices it.
//!
//! Shared by the open-charge and confirm-charge handlers so both compute the
//! amount the same way.

use std::sync::Arc;

use crate::domain::catalog::{City, SubscriptionPlan, UserProfile};
use crate::domain::foundation::{CityId, PlanId, UserId};
use crate::domain::subscription::{price, SubscriptionError};
use crate::ports::CatalogReader;

/// Everything known about a purchase before money moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub plan: SubscriptionPlan,
    pub city: City,
    pub user: UserProfile,
    pub is_home_city: bool,
    pub amount: i64,
}

/// Resolves plan, city and user, then applies the pricing rule.
#[derive(Clone)]
pub struct PriceQuoter {
    catalog: Arc<dyn CatalogReader>,
}

impl PriceQuoter {
    pub fn new(catalog: Arc<dyn CatalogReader>) -> Self {
        Self { catalog }
    }

    /// Quote `plan_id` in `city_id` for `user_id`.
    ///
    /// Lookups run plan, city, user; the first missing row decides the error.
    pub async fn quote(
        &self,
        user_id: UserId,
        city_id: CityId,
        plan_id: PlanId,
    ) -> Result<PriceQuote, SubscriptionError> {
        let plan = self
            .catalog
            .find_plan(plan_id)
            .await?
            .ok_or(SubscriptionError::InvalidPlan(plan_id))?;

        let city = self
            .catalog
            .find_city(city_id)
            .await?
            .ok_or(SubscriptionError::InvalidCity(city_id))?;

        let user = self
            .catalog
            .find_user_profile(user_id)
            .await?
            .ok_or(SubscriptionError::UserNotFound(user_id))?;

        let is_home_city = user.lives_in(city.id);
        let amount = price(plan.price, city.tier, is_home_city);

        Ok(PriceQuote {
            plan,
            city,
            user,
            is_home_city,
            amount,
        })
    }
}
