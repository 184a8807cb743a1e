//! Price computation for city subscriptions.
//!
//! Residents pay a plan's base price for their own city. Everyone else pays the
//! base price times the city's tier multiplier.

use crate::domain::catalog::CityTier;

/// Computes the charge amount for one purchase.
///
/// Pure and total: the same inputs always give the same amount.
pub fn price(plan_base_price: i64, city_tier: CityTier, is_users_home_city: bool) -> i64 {
    if is_users_home_city {
        return plan_base_price;
    }
    plan_base_price.saturating_mul(city_tier.price_multiplier())
}
