//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::gateway::HttpGatewayConfig;
use crate::application::handlers::subscription::DEFAULT_CHARGE_DESCRIPTION;

use super::error::ValidationError;

const MAX_TIMEOUT_SECS: u64 = 120;

/// Payment gateway client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Merchant id issued by the gateway
    pub merchant_id: SecretString,

    /// Redirect prefix the authority is appended to
    #[serde(default = "default_start_pay_url")]
    pub start_pay_url: String,

    /// Description shown to the payer on the gateway page
    #[serde(default = "default_description")]
    pub description: String,

    /// Bound on each open/verify call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn new(merchant_id: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            merchant_id: SecretString::new(merchant_id.into()),
            start_pay_url: default_start_pay_url(),
            description: default_description(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Client settings for `HttpPaymentGateway`
    pub fn client_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig::new(self.merchant_id.expose_secret().clone())
            .with_base_url(self.base_url.clone())
            .with_start_pay_url(self.start_pay_url.clone())
    }

    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.merchant_id.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__MERCHANT_ID"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if production {
            if !self.base_url.starts_with("https://") {
                return Err(ValidationError::GatewayUrlMustBeHttps("base_url"));
            }
            if !self.start_pay_url.starts_with("https://") {
                return Err(ValidationError::GatewayUrlMustBeHttps("start_pay_url"));
            }
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.zarinpal.com".to_string()
}

fn default_start_pay_url() -> String {
    "https://www.zarinpal.com/pg/StartPay/".to_string()
}

fn default_description() -> String {
    DEFAULT_CHARGE_DESCRIPTION.to_string()
}

fn default_timeout() -> u64 {
    30
}
