//! HTTP adapter for subscription endpoints.
//!
//! - `POST /subscriptions/checkout` - Open a charge, get the gateway redirect
//! - `POST /subscriptions/confirm` - Confirm a paid charge
//! - `GET /subscriptions` - All grants with city names
//! - `GET /subscriptions/cities/:city_id` - Grant for one city
//! - `GET /subscriptions/transactions` - Payment history

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedUser, SubscriptionApiError, SubscriptionAppState, SubscriptionSettings};
pub use routes::subscription_router;
