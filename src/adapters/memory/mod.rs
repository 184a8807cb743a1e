//! In-memory adapters for tests and local development.
//!
//! - `InMemoryCatalog` - Seedable plans, cities and user profiles
//! - `InMemorySubscriptionStore` - Pending purchases, grants and ledger with
//!   transactional semantics and fault injection
//! - `InMemorySubscriptionReader` - Read projections over the two above

mod catalog;
mod subscription_reader;
mod subscription_store;

pub use catalog::InMemoryCatalog;
pub use subscription_reader::InMemorySubscriptionReader;
pub use subscription_store::{InMemorySubscriptionStore, InMemoryTransaction};
