//! FetchPaymentGatewayInfoHandler - Command handler for opening a charge.
//!
//! Validates the request, prices it, opens a charge at the gateway and records
//! a pending purchase under the returned authority token. Nothing durable
//! beyond that pending purchase is written here.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{AuthorityToken, CityId, PlanId, Timestamp, UserId};
use crate::domain::subscription::{PendingPurchase, SubscriptionError};
use crate::ports::{CatalogReader, OpenChargeRequest, PaymentGateway, SubscriptionStore};

use super::gateway_timeout::{bounded, DEFAULT_GATEWAY_TIMEOUT};
use super::quote::PriceQuoter;

/// Description sent to the gateway when none is configured.
pub const DEFAULT_CHARGE_DESCRIPTION: &str = "City subscription";

/// Command to open a charge for a city subscription.
#[derive(Debug, Clone)]
pub struct FetchPaymentGatewayInfoCommand {
    pub user_id: UserId,
    pub city_id: CityId,
    pub plan_id: PlanId,
    pub callback_url: String,
}

/// Where to send the user, and the token to confirm with afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPaymentGatewayInfoResult {
    pub redirect_url: String,
    pub authority: AuthorityToken,
    pub amount: i64,
}

/// Handler for opening a charge.
///
/// Not idempotent: every call opens a new charge with a new authority.
pub struct FetchPaymentGatewayInfoHandler {
    quoter: PriceQuoter,
    store: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
    description: String,
    gateway_timeout: Duration,
}

impl FetchPaymentGatewayInfoHandler {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        store: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            quoter: PriceQuoter::new(catalog),
            store,
            gateway,
            description: DEFAULT_CHARGE_DESCRIPTION.to_string(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Set the description shown on the gateway page.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the bound on the open-charge call.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub async fn handle(
        &self,
        cmd: FetchPaymentGatewayInfoCommand,
    ) -> Result<FetchPaymentGatewayInfoResult, SubscriptionError> {
        // 1. Callback URL is required
        let callback_url = cmd.callback_url.trim();
        if callback_url.is_empty() {
            return Err(SubscriptionError::CallbackUrlMissing);
        }

        // 2. Duplicate-purchase guard; expired grants do not block
        if let Some(grant) = self.store.find_grant(cmd.user_id, cmd.city_id).await? {
            if grant.is_active_at(&Timestamp::now()) {
                return Err(SubscriptionError::AlreadySubscribedForCity {
                    user_id: cmd.user_id,
                    city_id: cmd.city_id,
                });
            }
        }

        // 3. Resolve plan, city and user, then price
        let quote = self
            .quoter
            .quote(cmd.user_id, cmd.city_id, cmd.plan_id)
            .await?;

        // 4. Open the charge
        let request = OpenChargeRequest {
            amount: quote.amount,
            callback_url: callback_url.to_string(),
            description: format!(
                "{}: {}, {}",
                self.description, quote.city.name, quote.plan.period
            ),
        };
        let charge = bounded(self.gateway_timeout, self.gateway.open_charge(request))
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %cmd.user_id,
                    city_id = %cmd.city_id,
                    error = %e,
                    "Gateway failed to open charge"
                );
                SubscriptionError::Gateway(e)
            })?;

        // 5. Record the pending purchase under the gateway's authority
        let pending = PendingPurchase::new(
            charge.authority.clone(),
            cmd.user_id,
            cmd.city_id,
            cmd.plan_id,
            quote.amount,
        );
        if let Err(e) = self.store.save_pending_purchase(&pending).await {
            tracing::error!(
                authority = %charge.authority,
                user_id = %cmd.user_id,
                error = %e,
                "Charge opened but pending purchase not saved"
            );
            return Err(e.into());
        }

        tracing::info!(
            authority = %charge.authority,
            user_id = %cmd.user_id,
            city_id = %cmd.city_id,
            plan_id = %cmd.plan_id,
            amount = quote.amount,
            "Charge opened"
        );

        Ok(FetchPaymentGatewayInfoResult {
            redirect_url: charge.redirect_url,
            authority: charge.authority,
            amount: quote.amount,
        })
    }
}
