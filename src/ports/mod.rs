//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway Port
//!
//! - `PaymentGateway` - Open and verify charges with the payment provider
//!
//! ## Storage Ports
//!
//! - `CatalogReader` - Plans, cities and user profiles (owned elsewhere)
//! - `SubscriptionStore` / `SubscriptionTransaction` - Pending purchases,
//!   grants and ledger writes as one unit of work
//! - `SubscriptionReader` - Read projections over grants and the ledger

mod catalog_reader;
mod payment_gateway;
mod subscription_reader;
mod subscription_store;

pub use catalog_reader::CatalogReader;
pub use payment_gateway::{OpenChargeRequest, OpenedCharge, PaymentGateway, VerifyOutcome};
pub use subscription_reader::{GrantWithCityName, SubscriptionReader};
pub use subscription_store::{SubscriptionStore, SubscriptionTransaction};
