//! PostgreSQL adapters.
//!
//! - `PostgresCatalogReader` - Plans, cities and users
//! - `PostgresSubscriptionStore` - Pending purchases, grants and ledger writes
//! - `PostgresSubscriptionReader` - Read projections
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod catalog_reader;
mod rows;
mod subscription_reader;
mod subscription_store;

pub use catalog_reader::PostgresCatalogReader;
pub use subscription_reader::PostgresSubscriptionReader;
pub use subscription_store::{PostgresSubscriptionStore, PostgresSubscriptionTransaction};
