//! CreateUserSubscriptionHandler - Command handler for confirming a charge.
//!
//! Runs the whole confirmation inside one store transaction:
//!
//! 1. Claim the pending purchase (read and delete in one step)
//! 2. Check the acting user owns it
//! 3. Reload plan, city and user; reprice
//! 4. Verify the charge at the gateway
//! 5. Replace any grant for the `(user, city)` slot
//! 6. Append the ledger entry
//!
//! # Outcomes
//!
//! | Situation | Transaction | Pending purchase |
//! |-----------|-------------|------------------|
//! | Unknown authority | rolled back | (none) |
//! | Wrong owner / stale catalog rows | rolled back | kept |
//! | Gateway says no, or gateway unreachable | committed | consumed |
//! | Verified | committed | consumed |
//! | Grant or ledger write fails | rolled back | kept |

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{AuthorityToken, Timestamp, UserId};
use crate::domain::subscription::{
    grant_expiry, LedgerEntry, NewLedgerEntry, NewSubscriptionGrant, SubscriptionError,
    SubscriptionGrant, FIRST_PURCHASE_BONUS_DAYS,
};
use crate::ports::{
    CatalogReader, PaymentGateway, SubscriptionStore, SubscriptionTransaction, VerifyOutcome,
};

use super::gateway_timeout::{bounded, DEFAULT_GATEWAY_TIMEOUT};
use super::quote::PriceQuoter;

/// Command to confirm a charge the user has paid.
#[derive(Debug, Clone)]
pub struct CreateUserSubscriptionCommand {
    pub user_id: UserId,
    pub authority: AuthorityToken,
}

/// Result of a successful confirmation.
#[derive(Debug, Clone)]
pub struct CreateUserSubscriptionResult {
    pub grant: SubscriptionGrant,
    pub ledger_entry: LedgerEntry,
    /// Whether this was the user's first grant for the city (bonus applied).
    pub first_purchase: bool,
}

/// How a confirmation ended inside the transaction.
enum Confirmation {
    /// All writes staged; commit them.
    Granted(CreateUserSubscriptionResult),
    /// The claim must stick even though the purchase failed.
    Consumed(SubscriptionError),
}

/// Handler for confirming a charge and granting the subscription.
pub struct CreateUserSubscriptionHandler {
    quoter: PriceQuoter,
    store: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
    first_purchase_bonus_days: i64,
    gateway_timeout: Duration,
}

impl CreateUserSubscriptionHandler {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        store: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            quoter: PriceQuoter::new(catalog),
            store,
            gateway,
            first_purchase_bonus_days: FIRST_PURCHASE_BONUS_DAYS,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Set the bonus added to a user's first grant for a city.
    pub fn with_first_purchase_bonus_days(mut self, days: i64) -> Self {
        self.first_purchase_bonus_days = days;
        self
    }

    /// Set the bound on the verify call.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub async fn handle(
        &self,
        cmd: CreateUserSubscriptionCommand,
    ) -> Result<CreateUserSubscriptionResult, SubscriptionError> {
        let mut tx = self.store.begin().await?;

        match self.confirm(&mut *tx, &cmd).await {
            Ok(Confirmation::Granted(result)) => {
                if let Err(e) = tx.commit().await {
                    tracing::error!(
                        authority = %cmd.authority,
                        user_id = %cmd.user_id,
                        error = %e,
                        "Failed to commit confirmed subscription"
                    );
                    return Err(e.into());
                }
                tracing::info!(
                    authority = %cmd.authority,
                    user_id = %cmd.user_id,
                    city_id = %result.grant.city_id,
                    grant_id = %result.grant.id,
                    expires_at = %result.grant.expires_at.as_datetime(),
                    first_purchase = result.first_purchase,
                    "Subscription granted"
                );
                Ok(result)
            }
            Ok(Confirmation::Consumed(err)) => {
                if let Err(e) = tx.commit().await {
                    tracing::error!(
                        authority = %cmd.authority,
                        error = %e,
                        "Failed to consume pending purchase after gateway failure"
                    );
                    return Err(e.into());
                }
                Err(err)
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    tracing::warn!(authority = %cmd.authority, error = %e, "Rollback failed");
                }
                if err.is_operational() {
                    tracing::error!(
                        authority = %cmd.authority,
                        user_id = %cmd.user_id,
                        error = %err,
                        "Confirmation aborted"
                    );
                }
                Err(err)
            }
        }
    }

    async fn confirm(
        &self,
        tx: &mut dyn SubscriptionTransaction,
        cmd: &CreateUserSubscriptionCommand,
    ) -> Result<Confirmation, SubscriptionError> {
        // 1. Claim
        let pending = tx
            .claim_pending_purchase(&cmd.authority)
            .await?
            .ok_or(SubscriptionError::InvalidOrConsumedAuthority)?;

        // 2. Ownership
        if !pending.is_owned_by(cmd.user_id) {
            tracing::warn!(
                authority = %cmd.authority,
                acting_user_id = %cmd.user_id,
                owner_user_id = %pending.user_id,
                "Confirmation attempted by a user who does not own the purchase"
            );
            return Err(SubscriptionError::DataMismatch);
        }

        // 3. Reload and reprice; catalog rows that vanished no longer match the purchase
        let quote = self
            .quoter
            .quote(pending.user_id, pending.city_id, pending.plan_id)
            .await
            .map_err(|e| match e {
                SubscriptionError::InvalidPlan(_) | SubscriptionError::InvalidCity(_) => {
                    SubscriptionError::DataMismatch
                }
                other => other,
            })?;

        if quote.amount != pending.amount {
            tracing::warn!(
                authority = %cmd.authority,
                opened_amount = pending.amount,
                current_amount = quote.amount,
                "Price changed since the charge was opened; verifying the opened amount"
            );
        }

        // 4. Verify; from here on a failure consumes the pending purchase
        let verified = bounded(
            self.gateway_timeout,
            self.gateway.verify_charge(pending.amount, &pending.authority),
        )
        .await;

        let reference_id = match verified {
            Ok(VerifyOutcome::Verified { reference_id }) => reference_id,
            Ok(VerifyOutcome::AlreadyVerified { reference_id }) => {
                tracing::warn!(
                    authority = %cmd.authority,
                    reference_id = %reference_id,
                    "Gateway reports payment already verified"
                );
                return Ok(Confirmation::Consumed(
                    SubscriptionError::PaymentAlreadyVerified,
                ));
            }
            Ok(VerifyOutcome::Rejected { code, message }) => {
                tracing::warn!(
                    authority = %cmd.authority,
                    code,
                    message = %message,
                    "Gateway rejected verification"
                );
                return Ok(Confirmation::Consumed(SubscriptionError::PaymentRejected {
                    code,
                }));
            }
            Err(e) => {
                tracing::error!(
                    authority = %cmd.authority,
                    error = %e,
                    "Payment verification failed"
                );
                return Ok(Confirmation::Consumed(SubscriptionError::PaymentFailed));
            }
        };

        // 5. Replace the grant
        let existing = tx.lock_grant(pending.user_id, pending.city_id).await?;
        let first_purchase = existing.is_none();
        if let Some(old) = existing {
            tx.delete_grant(old.id).await?;
        }

        let now = Timestamp::now();
        let expires_at = grant_expiry(
            now,
            quote.plan.period,
            first_purchase,
            self.first_purchase_bonus_days,
        );
        let grant = tx
            .insert_grant(NewSubscriptionGrant {
                user_id: pending.user_id,
                city_id: pending.city_id,
                plan_id: pending.plan_id,
                expires_at,
                created_at: now,
            })
            .await?;

        // 6. Ledger
        let ledger_entry = tx
            .append_ledger_entry(NewLedgerEntry::new(
                pending.user_id,
                pending.city_id,
                pending.amount,
                reference_id,
                pending.authority,
                quote.plan.period,
            ))
            .await?;

        Ok(Confirmation::Granted(CreateUserSubscriptionResult {
            grant,
            ledger_entry,
            first_purchase,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{InMemoryCatalog, InMemorySubscriptionStore};
    use crate::domain::catalog::{City, CityTier, PlanPeriod, SubscriptionPlan, UserProfile};
    use crate::domain::foundation::{CityId, PlanId};
    use crate::domain::subscription::{GatewayError, PendingPurchase};
    use chrono::Duration as ChronoDuration;

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    fn owner() -> UserId {
        UserId::new(1).unwrap()
    }

    fn stranger() -> UserId {
        UserId::new(2).unwrap()
    }

    fn city_id() -> CityId {
        CityId::new(20).unwrap()
    }

    fn plan_id() -> PlanId {
        PlanId::new(3).unwrap()
    }

    fn authority() -> AuthorityToken {
        AuthorityToken::new("A00000000000000000000000000000000042").unwrap()
    }

    struct Fixture {
        catalog: InMemoryCatalog,
        store: InMemorySubscriptionStore,
        gateway: MockPaymentGateway,
    }

    impl Fixture {
        async fn new() -> Self {
            let catalog = InMemoryCatalog::new();
            catalog.add_city(City::new(city_id(), "Kerman", CityTier::Important));
            catalog.add_plan(
                SubscriptionPlan::new(plan_id(), PlanPeriod::ThreeMonths, 1000).unwrap(),
            );
            catalog.add_user(UserProfile::new(owner(), None));
            catalog.add_user(UserProfile::new(stranger(), None));

            let store = InMemorySubscriptionStore::new();
            let pending = PendingPurchase::new(authority(), owner(), city_id(), plan_id(), 2000);
            store.save_pending_purchase(&pending).await.unwrap();

            Self {
                catalog,
                store,
                gateway: MockPaymentGateway::new(),
            }
        }

        fn handler(&self) -> CreateUserSubscriptionHandler {
            CreateUserSubscriptionHandler::new(
                Arc::new(self.catalog.clone()),
                Arc::new(self.store.clone()),
                Arc::new(self.gateway.clone()),
            )
        }
    }

    fn command(user_id: UserId) -> CreateUserSubscriptionCommand {
        CreateUserSubscriptionCommand {
            user_id,
            authority: authority(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn first_purchase_grants_period_plus_bonus() {
        let f = Fixture::new().await;
        let before = Timestamp::now();

        let result = f.handler().handle(command(owner())).await.unwrap();

        assert!(result.first_purchase);
        let granted = result.grant.expires_at.duration_since(&result.grant.created_at);
        assert_eq!(granted, ChronoDuration::days(90 + 15));
        assert!(!result.grant.created_at.is_before(&before));

        assert_eq!(result.ledger_entry.amount, 2000);
        assert_eq!(result.ledger_entry.period, PlanPeriod::ThreeMonths);
        assert_eq!(result.ledger_entry.authority, authority());

        assert!(f.store.pending_purchase(&authority()).is_none());
        assert_eq!(f.store.grants_for(owner(), city_id()), vec![result.grant]);
        assert_eq!(f.store.ledger_entries().len(), 1);
    }

    #[tokio::test]
    async fn replacing_expired_grant_gets_no_bonus() {
        let f = Fixture::new().await;
        let old = f
            .store
            .seed_grant(NewSubscriptionGrant::new(
                owner(),
                city_id(),
                plan_id(),
                Timestamp::now().add_days(-3),
            ))
            .unwrap();

        let result = f.handler().handle(command(owner())).await.unwrap();

        assert!(!result.first_purchase);
        assert_eq!(
            result.grant.expires_at.duration_since(&result.grant.created_at),
            ChronoDuration::days(90)
        );
        let grants = f.store.grants_for(owner(), city_id());
        assert_eq!(grants.len(), 1);
        assert_ne!(grants[0].id, old.id);
    }

    #[tokio::test]
    async fn bonus_length_follows_configuration() {
        let f = Fixture::new().await;

        let result = f
            .handler()
            .with_first_purchase_bonus_days(7)
            .handle(command(owner()))
            .await
            .unwrap();

        assert_eq!(
            result.grant.expires_at.duration_since(&result.grant.created_at),
            ChronoDuration::days(97)
        );
    }

    #[tokio::test]
    async fn verifies_with_opened_amount_when_price_drifted() {
        let f = Fixture::new().await;
        f.catalog.set_city_tier(city_id(), CityTier::Capital);

        let result = f.handler().handle(command(owner())).await.unwrap();

        assert_eq!(f.gateway.verify_calls()[0].amount, 2000);
        assert_eq!(result.ledger_entry.amount, 2000);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Resolution Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_authority_is_invalid_or_consumed() {
        let f = Fixture::new().await;
        let cmd = CreateUserSubscriptionCommand {
            user_id: owner(),
            authority: AuthorityToken::new("NEVER-ISSUED").unwrap(),
        };

        let err = f.handler().handle(cmd).await.unwrap_err();

        assert_eq!(err, SubscriptionError::InvalidOrConsumedAuthority);
        assert!(f.gateway.verify_calls().is_empty());
    }

    #[tokio::test]
    async fn second_confirmation_fails() {
        let f = Fixture::new().await;
        let handler = f.handler();

        handler.handle(command(owner())).await.unwrap();
        let err = handler.handle(command(owner())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::InvalidOrConsumedAuthority);
        assert_eq!(f.store.ledger_entries().len(), 1);
    }

    #[tokio::test]
    async fn other_users_confirmation_is_mismatch_and_keeps_pending() {
        let f = Fixture::new().await;

        let err = f.handler().handle(command(stranger())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::DataMismatch);
        assert!(f.store.pending_purchase(&authority()).is_some());
        assert!(f.gateway.verify_calls().is_empty());

        // The owner can still confirm
        assert!(f.handler().handle(command(owner())).await.is_ok());
    }

    #[tokio::test]
    async fn removed_plan_is_mismatch() {
        let f = Fixture::new().await;
        f.catalog.remove_plan(plan_id());

        let err = f.handler().handle(command(owner())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::DataMismatch);
        assert!(f.gateway.verify_calls().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Gateway Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn already_verified_is_terminal_and_consumes_pending() {
        let f = Fixture::new().await;
        f.gateway.push_verify_outcome(VerifyOutcome::AlreadyVerified {
            reference_id: "55".into(),
        });

        let err = f.handler().handle(command(owner())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::PaymentAlreadyVerified);
        assert!(f.store.pending_purchase(&authority()).is_none());
        assert!(f.store.all_grants().is_empty());
        assert!(f.store.ledger_entries().is_empty());
    }

    #[tokio::test]
    async fn rejection_surfaces_gateway_code() {
        let f = Fixture::new().await;
        f.gateway.push_verify_outcome(VerifyOutcome::Rejected {
            code: -51,
            message: "unsuccessful payment".into(),
        });

        let err = f.handler().handle(command(owner())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::PaymentRejected { code: -51 });
        assert!(f.store.pending_purchase(&authority()).is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_generic_payment_failure() {
        let f = Fixture::new().await;
        f.gateway
            .fail_verify_with(GatewayError::Transport("connection reset".into()));

        let err = f.handler().handle(command(owner())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::PaymentFailed);
        assert!(f.store.pending_purchase(&authority()).is_none());

        let retry = f.handler().handle(command(owner())).await.unwrap_err();
        assert_eq!(retry, SubscriptionError::InvalidOrConsumedAuthority);
    }

    #[tokio::test]
    async fn verify_timeout_is_generic_payment_failure() {
        let f = Fixture::new().await;
        let handler = CreateUserSubscriptionHandler::new(
            Arc::new(f.catalog.clone()),
            Arc::new(f.store.clone()),
            Arc::new(MockPaymentGateway::slow(Duration::from_secs(5))),
        )
        .with_gateway_timeout(Duration::from_millis(20));

        let err = handler.handle(command(owner())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::PaymentFailed);
        assert!(f.store.pending_purchase(&authority()).is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Atomicity Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn ledger_failure_rolls_back_grant_replacement() {
        let f = Fixture::new().await;
        let old = f
            .store
            .seed_grant(NewSubscriptionGrant::new(
                owner(),
                city_id(),
                plan_id(),
                Timestamp::now().add_days(-3),
            ))
            .unwrap();
        f.store.set_fail_ledger_appends(true);

        let err = f.handler().handle(command(owner())).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::Infrastructure(_)));
        assert_eq!(f.store.grants_for(owner(), city_id()), vec![old]);
        assert!(f.store.ledger_entries().is_empty());
        assert!(f.store.pending_purchase(&authority()).is_some());
    }

    #[tokio::test]
    async fn grant_failure_writes_nothing() {
        let f = Fixture::new().await;
        f.store.set_fail_grant_inserts(true);

        let err = f.handler().handle(command(owner())).await.unwrap_err();

        assert!(err.is_operational());
        assert!(f.store.all_grants().is_empty());
        assert!(f.store.ledger_entries().is_empty());
    }
}
