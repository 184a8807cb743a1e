//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `gateway` - Payment gateway clients (HTTP, mock)
//! - `http` - REST API
//! - `maintenance` - Background upkeep tasks
//! - `memory` - In-memory storage for tests and local runs
//! - `postgres` - PostgreSQL storage

pub mod gateway;
pub mod http;
pub mod maintenance;
pub mod memory;
pub mod postgres;

pub use gateway::{HttpGatewayConfig, HttpPaymentGateway, MockPaymentGateway};
pub use maintenance::{PendingPurchaseReaper, ReaperConfig};
pub use memory::{InMemoryCatalog, InMemorySubscriptionReader, InMemorySubscriptionStore};
pub use postgres::{PostgresCatalogReader, PostgresSubscriptionReader, PostgresSubscriptionStore};
