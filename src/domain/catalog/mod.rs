//! Catalog domain module.
//!
//! Read-only data owned by other back-office subsystems: cities and their
//! tiers, subscription plans, and user profiles.

mod city;
mod plan;
mod user;

pub use city::{City, CityTier};
pub use plan::{PlanPeriod, SubscriptionPlan};
pub use user::UserProfile;
