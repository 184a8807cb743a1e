//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `CITYPASS` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use citypass::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod gateway;
mod server;
mod subscription;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use server::{Environment, LogFormat, ServerConfig};
pub use subscription::SubscriptionConfig;

use serde::Deserialize;

use crate::adapters::http::SubscriptionSettings;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub gateway: GatewayConfig,

    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// Reads `.env` if present, then `CITYPASS__*` variables:
    ///
    /// - `CITYPASS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CITYPASS__DATABASE__URL=...` -> `database.url = ...`
    /// - `CITYPASS__GATEWAY__MERCHANT_ID=...` -> `gateway.merchant_id = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CITYPASS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every section, plus the constraints that span sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate(self.is_production())?;
        self.subscription.validate()?;

        // A request must outlive the gateway call it waits on.
        if self.gateway.timeout_secs >= self.server.request_timeout_secs {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Handler tunables derived from the gateway and subscription sections.
    pub fn subscription_settings(&self) -> SubscriptionSettings {
        SubscriptionSettings {
            charge_description: self.gateway.description.clone(),
            gateway_timeout: self.gateway.timeout(),
            first_purchase_bonus_days: self.subscription.first_purchase_bonus_days,
        }
    }
}
