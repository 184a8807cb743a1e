//! PendingPurchaseReaper - Background service that deletes abandoned purchases.
//!
//! A user who opens a charge and never comes back leaves a pending purchase
//! behind. The reaper periodically deletes those older than a TTL; a reaped
//! authority then resolves to "invalid or consumed" like any other unknown one.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 5m | Time between sweeps |
//! | `ttl` | 24h | Age after which a pending purchase is deleted |
//!
//! ## Graceful Shutdown
//!
//! The service listens on a watch channel and exits after the sweep in
//! progress, if any, finishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::SubscriptionStore;

/// Configuration for the PendingPurchaseReaper service.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Time between sweeps.
    pub interval: Duration,

    /// Pending purchases older than this are deleted.
    pub ttl: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            ttl: Duration::from_secs(86_400),
        }
    }
}

impl ReaperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Background service that deletes stale pending purchases.
pub struct PendingPurchaseReaper {
    store: Arc<dyn SubscriptionStore>,
    config: ReaperConfig,
}

impl PendingPurchaseReaper {
    pub fn new(store: Arc<dyn SubscriptionStore>, config: ReaperConfig) -> Self {
        Self { store, config }
    }

    /// Run sweeps until the shutdown signal flips to `true`.
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            ttl_secs = self.config.ttl.as_secs(),
            "Pending purchase reaper started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Pending purchase reaper stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Pending purchase sweep failed");
                    }
                }
            }
        }
    }

    /// Run one sweep and return how many pending purchases were deleted.
    pub async fn sweep(&self) -> Result<u64, DomainError> {
        let cutoff = Timestamp::now().minus_secs(self.config.ttl.as_secs());
        let deleted = self.store.delete_pending_older_than(cutoff).await?;

        if deleted > 0 {
            tracing::info!(
                deleted,
                cutoff = %cutoff.as_datetime(),
                "Reaped stale pending purchases"
            );
        } else {
            tracing::debug!("No stale pending purchases");
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::domain::foundation::{AuthorityToken, CityId, ErrorCode, PlanId, UserId};
    use crate::domain::subscription::{PendingPurchase, SubscriptionGrant};
    use crate::ports::SubscriptionTransaction;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pending(token: &str) -> PendingPurchase {
        PendingPurchase::new(
            AuthorityToken::new(token).unwrap(),
            UserId::new(1).unwrap(),
            CityId::new(2).unwrap(),
            PlanId::new(3).unwrap(),
            1000,
        )
    }

    fn config() -> ReaperConfig {
        ReaperConfig::default()
            .with_interval(Duration::from_millis(10))
            .with_ttl(Duration::from_secs(3600))
    }

    #[test]
    fn default_config_sweeps_every_five_minutes_with_one_day_ttl() {
        let config = ReaperConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.ttl, Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn sweep_deletes_only_expired_purchases() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("STALE")).await.unwrap();
        store.save_pending_purchase(&pending("FRESH")).await.unwrap();
        store.backdate_pending(
            &AuthorityToken::new("STALE").unwrap(),
            Timestamp::now().minus_secs(7200),
        );

        let reaper = PendingPurchaseReaper::new(Arc::new(store.clone()), config());
        let deleted = reaper.sweep().await.unwrap();

        assert_eq!(deleted, 1);
        assert!(store
            .pending_purchase(&AuthorityToken::new("FRESH").unwrap())
            .is_some());
    }

    #[tokio::test]
    async fn oversized_ttl_keeps_fresh_purchases() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("FRESH")).await.unwrap();

        let reaper = PendingPurchaseReaper::new(
            Arc::new(store.clone()),
            config().with_ttl(Duration::from_secs(u64::MAX)),
        );

        assert_eq!(reaper.sweep().await.unwrap(), 0);
        assert_eq!(store.pending_count(), 1);
    }

    #[tokio::test]
    async fn run_sweeps_until_shutdown() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("STALE")).await.unwrap();
        store.backdate_pending(
            &AuthorityToken::new("STALE").unwrap(),
            Timestamp::now().minus_secs(7200),
        );

        let reaper = PendingPurchaseReaper::new(Arc::new(store.clone()), config());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { reaper.run(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.pending_count(), 0);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper stops on shutdown")
            .unwrap();
    }

    struct FlakyStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SubscriptionStore for FlakyStore {
        async fn save_pending_purchase(&self, _p: &PendingPurchase) -> Result<(), DomainError> {
            Ok(())
        }

        async fn find_grant(
            &self,
            _user_id: UserId,
            _city_id: CityId,
        ) -> Result<Option<SubscriptionGrant>, DomainError> {
            Ok(None)
        }

        async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError> {
            Err(DomainError::database("not used"))
        }

        async fn delete_pending_older_than(&self, _cutoff: Timestamp) -> Result<u64, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::new(ErrorCode::DatabaseError, "connection refused"))
        }
    }

    #[tokio::test]
    async fn failed_sweep_does_not_stop_the_loop() {
        let store = Arc::new(FlakyStore {
            calls: AtomicUsize::new(0),
        });
        let reaper = PendingPurchaseReaper::new(store.clone(), config());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { reaper.run(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(store.calls.load(Ordering::SeqCst) >= 2);
    }
}
