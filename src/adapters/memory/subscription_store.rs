//! In-memory subscription store.
//!
//! Mirrors the PostgreSQL adapter's transactional behaviour closely enough
//! for the workflow tests:
//!
//! - Claiming a pending purchase removes it from shared state at once, so a
//!   concurrent claimer sees nothing; rollback (or drop) puts it back
//! - `lock_grant` takes a per-`(user, city)` async mutex held until the
//!   transaction ends
//! - Grant and ledger writes are staged and applied together on commit
//! - Ids are allocated on insert and never reused, like a sequence
//!
//! Ledger appends and grant inserts can be made to fail for atomicity tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::domain::foundation::{
    AuthorityToken, CityId, DomainError, ErrorCode, GrantId, LedgerEntryId, Timestamp, UserId,
};
use crate::domain::subscription::{
    LedgerEntry, NewLedgerEntry, NewSubscriptionGrant, PendingPurchase, SubscriptionGrant,
};
use crate::ports::{SubscriptionStore, SubscriptionTransaction};

type SlotKey = (UserId, CityId);

/// In-memory `SubscriptionStore`.
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemorySubscriptionStore {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<StoreState>,
    slots: Mutex<HashMap<SlotKey, Arc<tokio::sync::Mutex<()>>>>,
}

#[derive(Default)]
struct StoreState {
    pending: HashMap<AuthorityToken, PendingPurchase>,
    grants: BTreeMap<GrantId, SubscriptionGrant>,
    ledger: Vec<LedgerEntry>,
    last_grant_id: i64,
    last_ledger_id: i64,
    fail_ledger_appends: bool,
    fail_grant_inserts: bool,
}

impl StoreState {
    fn grant_for(&self, user_id: UserId, city_id: CityId) -> Option<&SubscriptionGrant> {
        self.grants
            .values()
            .find(|g| g.user_id == user_id && g.city_id == city_id)
    }
}

// Every mutation below is a single map operation, so a poisoned lock still
// guards consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Fault Injection
    // ════════════════════════════════════════════════════════════════════════════

    /// Make every ledger append fail until turned off.
    pub fn set_fail_ledger_appends(&self, fail: bool) {
        lock(&self.shared.state).fail_ledger_appends = fail;
    }

    /// Make every grant insert fail until turned off.
    pub fn set_fail_grant_inserts(&self, fail: bool) {
        lock(&self.shared.state).fail_grant_inserts = fail;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection and Seeding
    // ════════════════════════════════════════════════════════════════════════════

    pub fn pending_purchase(&self, authority: &AuthorityToken) -> Option<PendingPurchase> {
        lock(&self.shared.state).pending.get(authority).cloned()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.shared.state).pending.len()
    }

    /// Every committed grant for a pair (the invariant says zero or one).
    pub fn grants_for(&self, user_id: UserId, city_id: CityId) -> Vec<SubscriptionGrant> {
        lock(&self.shared.state)
            .grants
            .values()
            .filter(|g| g.user_id == user_id && g.city_id == city_id)
            .cloned()
            .collect()
    }

    pub fn all_grants(&self) -> Vec<SubscriptionGrant> {
        lock(&self.shared.state).grants.values().cloned().collect()
    }

    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        lock(&self.shared.state).ledger.clone()
    }

    /// Insert a grant outside any transaction, e.g. a prior purchase.
    pub fn seed_grant(&self, grant: NewSubscriptionGrant) -> Result<SubscriptionGrant, DomainError> {
        let mut state = lock(&self.shared.state);
        state.last_grant_id += 1;
        let grant = grant.with_id(GrantId::new(state.last_grant_id)?);
        state.grants.insert(grant.id, grant.clone());
        Ok(grant)
    }

    /// Move a pending purchase's creation time, e.g. to make it reapable.
    pub fn backdate_pending(&self, authority: &AuthorityToken, created_at: Timestamp) {
        if let Some(pending) = lock(&self.shared.state).pending.get_mut(authority) {
            pending.created_at = created_at;
        }
    }

    /// Move a committed grant's expiry into the past.
    pub fn expire_grant(&self, id: GrantId) {
        if let Some(grant) = lock(&self.shared.state).grants.get_mut(&id) {
            grant.expires_at = Timestamp::now().add_days(-1);
        }
    }

    fn slot(&self, key: SlotKey) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(lock(&self.shared.slots).entry(key).or_default())
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn save_pending_purchase(&self, pending: &PendingPurchase) -> Result<(), DomainError> {
        let mut state = lock(&self.shared.state);
        if state.pending.contains_key(&pending.authority) {
            return Err(DomainError::database(format!(
                "Duplicate pending purchase for authority {}",
                pending.authority
            )));
        }
        state
            .pending
            .insert(pending.authority.clone(), pending.clone());
        Ok(())
    }

    async fn find_grant(
        &self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Option<SubscriptionGrant>, DomainError> {
        Ok(lock(&self.shared.state).grant_for(user_id, city_id).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError> {
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            claimed: Vec::new(),
            deleted_grants: HashSet::new(),
            inserted_grants: Vec::new(),
            ledger_entries: Vec::new(),
            held_slots: HashMap::new(),
            finished: false,
        }))
    }

    async fn delete_pending_older_than(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut state = lock(&self.shared.state);
        let before = state.pending.len();
        state.pending.retain(|_, p| !p.is_older_than(&cutoff));
        Ok((before - state.pending.len()) as u64)
    }
}

/// Unit of work over [`InMemorySubscriptionStore`].
pub struct InMemoryTransaction {
    store: InMemorySubscriptionStore,
    claimed: Vec<PendingPurchase>,
    deleted_grants: HashSet<GrantId>,
    inserted_grants: Vec<SubscriptionGrant>,
    ledger_entries: Vec<LedgerEntry>,
    held_slots: HashMap<SlotKey, OwnedMutexGuard<()>>,
    finished: bool,
}

impl InMemoryTransaction {
    fn restore_claims(&mut self) {
        if self.claimed.is_empty() {
            return;
        }
        let mut state = lock(&self.store.shared.state);
        for pending in self.claimed.drain(..) {
            state.pending.insert(pending.authority.clone(), pending);
        }
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.restore_claims();
        }
    }
}

#[async_trait]
impl SubscriptionTransaction for InMemoryTransaction {
    async fn claim_pending_purchase(
        &mut self,
        authority: &AuthorityToken,
    ) -> Result<Option<PendingPurchase>, DomainError> {
        let claimed = lock(&self.store.shared.state).pending.remove(authority);
        if let Some(pending) = &claimed {
            self.claimed.push(pending.clone());
        }
        Ok(claimed)
    }

    async fn lock_grant(
        &mut self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Option<SubscriptionGrant>, DomainError> {
        let key = (user_id, city_id);
        if !self.held_slots.contains_key(&key) {
            let guard = self.store.slot(key).lock_owned().await;
            self.held_slots.insert(key, guard);
        }

        let state = lock(&self.store.shared.state);
        let staged = self
            .inserted_grants
            .iter()
            .find(|g| g.user_id == user_id && g.city_id == city_id)
            .cloned();
        let committed = state
            .grant_for(user_id, city_id)
            .filter(|g| !self.deleted_grants.contains(&g.id))
            .cloned();
        Ok(staged.or(committed))
    }

    async fn delete_grant(&mut self, id: GrantId) -> Result<(), DomainError> {
        if let Some(pos) = self.inserted_grants.iter().position(|g| g.id == id) {
            self.inserted_grants.remove(pos);
            return Ok(());
        }
        let exists = lock(&self.store.shared.state).grants.contains_key(&id);
        if !exists || self.deleted_grants.contains(&id) {
            return Err(DomainError::new(
                ErrorCode::GrantNotFound,
                format!("Grant not found: {}", id),
            ));
        }
        self.deleted_grants.insert(id);
        Ok(())
    }

    async fn insert_grant(
        &mut self,
        grant: NewSubscriptionGrant,
    ) -> Result<SubscriptionGrant, DomainError> {
        let mut state = lock(&self.store.shared.state);
        if state.fail_grant_inserts {
            return Err(DomainError::database("Simulated grant insert failure"));
        }

        let taken = self
            .inserted_grants
            .iter()
            .any(|g| g.user_id == grant.user_id && g.city_id == grant.city_id)
            || state
                .grant_for(grant.user_id, grant.city_id)
                .is_some_and(|g| !self.deleted_grants.contains(&g.id));
        if taken {
            return Err(DomainError::database(format!(
                "Duplicate grant for user {} in city {}",
                grant.user_id, grant.city_id
            )));
        }

        state.last_grant_id += 1;
        let id = GrantId::new(state.last_grant_id)?;
        let grant = grant.with_id(id);
        self.inserted_grants.push(grant.clone());
        Ok(grant)
    }

    async fn append_ledger_entry(
        &mut self,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, DomainError> {
        let mut state = lock(&self.store.shared.state);
        if state.fail_ledger_appends {
            return Err(DomainError::database("Simulated ledger append failure"));
        }
        state.last_ledger_id += 1;
        let id = LedgerEntryId::new(state.last_ledger_id)?;
        let entry = entry.with_id(id);
        self.ledger_entries.push(entry.clone());
        Ok(entry)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        {
            let mut state = lock(&self.store.shared.state);
            for id in self.deleted_grants.drain() {
                state.grants.remove(&id);
            }
            for grant in self.inserted_grants.drain(..) {
                state.grants.insert(grant.id, grant);
            }
            state.ledger.append(&mut self.ledger_entries);
        }
        self.claimed.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DomainError> {
        self.restore_claims();
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::PlanPeriod;
    use crate::domain::foundation::PlanId;

    fn authority(s: &str) -> AuthorityToken {
        AuthorityToken::new(s).unwrap()
    }

    fn user() -> UserId {
        UserId::new(1).unwrap()
    }

    fn city() -> CityId {
        CityId::new(2).unwrap()
    }

    fn pending(token: &str) -> PendingPurchase {
        PendingPurchase::new(authority(token), user(), city(), PlanId::new(3).unwrap(), 1000)
    }

    fn new_grant(days: i64) -> NewSubscriptionGrant {
        NewSubscriptionGrant::new(user(), city(), PlanId::new(3).unwrap(), Timestamp::now().add_days(days))
    }

    fn ledger_entry(token: &str) -> NewLedgerEntry {
        NewLedgerEntry::new(user(), city(), 1000, "ref-1", authority(token), PlanPeriod::OneMonth)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Pending Purchase Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_authority_is_rejected() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("A1")).await.unwrap();

        let err = store.save_pending_purchase(&pending("A1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn claim_is_single_use() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("A1")).await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        assert!(first.claim_pending_purchase(&authority("A1")).await.unwrap().is_some());
        assert!(second.claim_pending_purchase(&authority("A1")).await.unwrap().is_none());

        first.commit().await.unwrap();
        second.rollback().await.unwrap();
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn rollback_restores_claim() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("A1")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.claim_pending_purchase(&authority("A1")).await.unwrap();
        assert_eq!(store.pending_count(), 0);
        tx.rollback().await.unwrap();

        assert!(store.pending_purchase(&authority("A1")).is_some());
    }

    #[tokio::test]
    async fn dropped_transaction_restores_claim() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("A1")).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.claim_pending_purchase(&authority("A1")).await.unwrap();
        }

        assert_eq!(store.pending_count(), 1);
    }

    #[tokio::test]
    async fn delete_pending_older_than_only_removes_stale_rows() {
        let store = InMemorySubscriptionStore::new();
        store.save_pending_purchase(&pending("OLD")).await.unwrap();
        store.save_pending_purchase(&pending("NEW")).await.unwrap();
        store.backdate_pending(&authority("OLD"), Timestamp::now().add_days(-2));

        let removed = store
            .delete_pending_older_than(Timestamp::now().add_days(-1))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.pending_purchase(&authority("NEW")).is_some());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Grant and Ledger Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = InMemorySubscriptionStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.lock_grant(user(), city()).await.unwrap();
        tx.insert_grant(new_grant(30)).await.unwrap();
        tx.append_ledger_entry(ledger_entry("A1")).await.unwrap();
        assert!(store.all_grants().is_empty());
        assert!(store.ledger_entries().is_empty());

        tx.commit().await.unwrap();
        assert_eq!(store.grants_for(user(), city()).len(), 1);
        assert_eq!(store.ledger_entries().len(), 1);
    }

    #[tokio::test]
    async fn replace_within_transaction_keeps_one_grant() {
        let store = InMemorySubscriptionStore::new();
        let old = store.seed_grant(new_grant(-5)).unwrap();

        let mut tx = store.begin().await.unwrap();
        let existing = tx.lock_grant(user(), city()).await.unwrap();
        assert_eq!(existing.as_ref().map(|g| g.id), Some(old.id));
        tx.delete_grant(old.id).await.unwrap();
        let fresh = tx.insert_grant(new_grant(30)).await.unwrap();
        tx.commit().await.unwrap();

        let grants = store.grants_for(user(), city());
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].id, fresh.id);
        assert_ne!(fresh.id, old.id);
    }

    #[tokio::test]
    async fn second_insert_for_same_pair_violates_uniqueness() {
        let store = InMemorySubscriptionStore::new();
        store.seed_grant(new_grant(10)).unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_grant(new_grant(30)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn deleting_missing_grant_fails() {
        let store = InMemorySubscriptionStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx.delete_grant(GrantId::new(99).unwrap()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::GrantNotFound);
    }

    #[tokio::test]
    async fn injected_ledger_failure_is_reported() {
        let store = InMemorySubscriptionStore::new();
        store.set_fail_ledger_appends(true);

        let mut tx = store.begin().await.unwrap();
        let err = tx.append_ledger_entry(ledger_entry("A1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn grant_slot_blocks_second_transaction_until_first_ends() {
        let store = InMemorySubscriptionStore::new();
        let mut first = store.begin().await.unwrap();
        first.lock_grant(user(), city()).await.unwrap();

        let contender = store.clone();
        let waiter = tokio::spawn(async move {
            let mut second = contender.begin().await.unwrap();
            let seen = second.lock_grant(user(), city()).await.unwrap();
            second.rollback().await.unwrap();
            seen
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.insert_grant(new_grant(30)).await.unwrap();
        first.commit().await.unwrap();

        let seen = waiter.await.unwrap();
        assert!(seen.is_some(), "second transaction sees the committed grant");
    }
}
