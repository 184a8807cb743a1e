//! Subscription store port (write side).
//!
//! Owns pending purchases, grants and ledger entries. Confirmation runs
//! through a [`SubscriptionTransaction`] so that claiming the pending purchase,
//! replacing the grant and appending the ledger entry commit or roll back
//! together.
//!
//! # Design
//!
//! - **Atomic claim**: `claim_pending_purchase` reads and deletes in one step;
//!   of two concurrent claimers for the same authority only one gets the row
//! - **Serialized grant slot**: `lock_grant` holds the `(user, city)` slot until
//!   the transaction ends, so two purchases for the same pair cannot both
//!   observe "no grant" and insert
//! - **Drop is rollback**: a transaction dropped without `commit` leaves no trace
//!
//! # Example
//!
//! ```ignore
//! let mut tx = store.begin().await?;
//! let Some(pending) = tx.claim_pending_purchase(&authority).await? else {
//!     tx.rollback().await?;
//!     return Err(SubscriptionError::InvalidOrConsumedAuthority);
//! };
//! let existing = tx.lock_grant(pending.user_id, pending.city_id).await?;
//! if let Some(old) = existing {
//!     tx.delete_grant(old.id).await?;
//! }
//! let grant = tx.insert_grant(new_grant).await?;
//! tx.append_ledger_entry(entry).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{AuthorityToken, CityId, DomainError, GrantId, Timestamp, UserId};
use crate::domain::subscription::{
    LedgerEntry, NewLedgerEntry, NewSubscriptionGrant, PendingPurchase, SubscriptionGrant,
};

/// Repository port for the purchase workflow's durable state.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Persist a newly opened pending purchase.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if the authority already exists or on persistence failure
    async fn save_pending_purchase(&self, pending: &PendingPurchase) -> Result<(), DomainError>;

    /// Find the grant for a `(user, city)` pair, expired or not.
    async fn find_grant(
        &self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Option<SubscriptionGrant>, DomainError>;

    /// Start a unit of work for a confirmation.
    async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError>;

    /// Delete pending purchases created before `cutoff`.
    ///
    /// Returns the number of rows removed.
    async fn delete_pending_older_than(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

/// One confirmation's unit of work.
#[async_trait]
pub trait SubscriptionTransaction: Send {
    /// Atomically read and delete the pending purchase for `authority`.
    ///
    /// Returns `None` if no such record exists (never issued, already
    /// consumed, or reaped).
    async fn claim_pending_purchase(
        &mut self,
        authority: &AuthorityToken,
    ) -> Result<Option<PendingPurchase>, DomainError>;

    /// Take the `(user, city)` grant slot for the rest of the transaction and
    /// return the grant currently occupying it, if any.
    async fn lock_grant(
        &mut self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Option<SubscriptionGrant>, DomainError>;

    /// Delete a grant.
    ///
    /// # Errors
    ///
    /// - `GrantNotFound` if the grant does not exist
    async fn delete_grant(&mut self, id: GrantId) -> Result<(), DomainError>;

    /// Insert a grant and return it with its assigned id.
    async fn insert_grant(
        &mut self,
        grant: NewSubscriptionGrant,
    ) -> Result<SubscriptionGrant, DomainError>;

    /// Append a ledger entry and return it with its assigned id.
    async fn append_ledger_entry(&mut self, entry: NewLedgerEntry)
        -> Result<LedgerEntry, DomainError>;

    /// Make every change in this transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discard every change in this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SubscriptionStore) {}
    }

    #[test]
    fn subscription_transaction_is_object_safe() {
        fn _accepts_box(_tx: Box<dyn SubscriptionTransaction>) {}
    }
}
