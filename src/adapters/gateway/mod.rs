//! Payment gateway adapters.
//!
//! - `HttpPaymentGateway` - JSON request/verify API client
//! - `MockPaymentGateway` - Configurable in-process gateway for tests

mod http_gateway;
mod mock_payment_gateway;

pub use http_gateway::{HttpGatewayConfig, HttpPaymentGateway};
pub use mock_payment_gateway::{MockPaymentGateway, VerifyCall};
