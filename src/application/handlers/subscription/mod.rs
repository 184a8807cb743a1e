//! Subscription handlers.
//!
//! Command and query handlers for the city-subscription purchase workflow:
//!
//! ## Commands
//! - Opening a charge at the payment gateway
//! - Confirming a paid charge and granting the subscription
//!
//! ## Queries
//! - A user's grant for one city
//! - A user's payment history
//! - A user's subscription list with city names

mod create_user_subscription;
mod fetch_payment_gateway_info;
mod fetch_user_payment_transactions_history;
mod fetch_user_subscription_list;
mod gateway_timeout;
mod get_user_subscriptions_by_city;
mod quote;

// Commands
pub use create_user_subscription::{
    CreateUserSubscriptionCommand, CreateUserSubscriptionHandler, CreateUserSubscriptionResult,
};
pub use fetch_payment_gateway_info::{
    FetchPaymentGatewayInfoCommand, FetchPaymentGatewayInfoHandler, FetchPaymentGatewayInfoResult,
    DEFAULT_CHARGE_DESCRIPTION,
};

// Queries
pub use fetch_user_payment_transactions_history::{
    FetchUserPaymentTransactionsHistoryHandler, FetchUserPaymentTransactionsHistoryQuery,
    FetchUserPaymentTransactionsHistoryResult,
};
pub use fetch_user_subscription_list::{
    CitySubscription, FetchUserSubscriptionListHandler, FetchUserSubscriptionListQuery,
    FetchUserSubscriptionListResult,
};
pub use get_user_subscriptions_by_city::{
    GetUserSubscriptionsByCityHandler, GetUserSubscriptionsByCityQuery,
    GetUserSubscriptionsByCityResult, GrantStatus,
};

// Shared
pub use gateway_timeout::DEFAULT_GATEWAY_TIMEOUT;
pub use quote::{PriceQuote, PriceQuoter};
