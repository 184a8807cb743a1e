//! PostgreSQL implementation of SubscriptionStore.
//!
//! # Concurrency
//!
//! - The pending purchase is claimed with `DELETE ... RETURNING` inside the
//!   confirmation transaction. A concurrent claimer blocks on the row lock and
//!   then finds nothing (commit) or the row (rollback).
//! - The `(user, city)` grant slot is serialized with a transaction-scoped
//!   advisory lock, so the first purchase for a pair is covered even though no
//!   row exists yet to lock. The existing grant, if any, is then read
//!   `FOR UPDATE`.
//! - `UNIQUE (user_id, city_id)` on `user_subscriptions` backs both.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::foundation::{
    AuthorityToken, CityId, DomainError, ErrorCode, GrantId, Timestamp, UserId,
};
use crate::domain::subscription::{
    LedgerEntry, NewLedgerEntry, NewSubscriptionGrant, PendingPurchase, SubscriptionGrant,
};
use crate::ports::{SubscriptionStore, SubscriptionTransaction};

use super::rows::{db_error, GrantRow, LedgerRow, PendingPurchaseRow};

const GRANT_COLUMNS: &str = "id, user_id, city_id, plan_id, expires_at, created_at";

const CLAIM_PENDING_SQL: &str = r#"
    DELETE FROM pending_purchases
    WHERE authority = $1
    RETURNING authority, user_id, city_id, plan_id, amount, created_at
"#;

const LOCK_GRANT_SLOT_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

/// Advisory lock key for one `(user, city)` grant slot.
fn grant_slot_key(user_id: UserId, city_id: CityId) -> String {
    format!("user_subscriptions:{}:{}", user_id, city_id)
}

fn select_grant_sql(for_update: bool) -> String {
    format!(
        "SELECT {} FROM user_subscriptions WHERE user_id = $1 AND city_id = $2{}",
        GRANT_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    )
}

fn insert_grant_sql() -> String {
    format!(
        r#"
        INSERT INTO user_subscriptions (user_id, city_id, plan_id, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        GRANT_COLUMNS
    )
}

pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn save_pending_purchase(&self, pending: &PendingPurchase) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO pending_purchases (authority, user_id, city_id, plan_id, amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(pending.authority.as_str())
        .bind(pending.user_id.as_i64())
        .bind(pending.city_id.as_i64())
        .bind(pending.plan_id.as_i64())
        .bind(pending.amount)
        .bind(pending.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to save pending purchase"))?;

        Ok(())
    }

    async fn find_grant(
        &self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Option<SubscriptionGrant>, DomainError> {
        let row: Option<GrantRow> = sqlx::query_as(&select_grant_sql(false))
        .bind(user_id.as_i64())
        .bind(city_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch grant"))?;

        row.map(SubscriptionGrant::try_from).transpose()
    }

    async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        Ok(Box::new(PostgresSubscriptionTransaction { tx }))
    }

    async fn delete_pending_older_than(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM pending_purchases WHERE created_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete stale pending purchases"))?;

        Ok(result.rows_affected())
    }
}

/// One confirmation's database transaction.
///
/// Dropping it without `commit` rolls back.
pub struct PostgresSubscriptionTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SubscriptionTransaction for PostgresSubscriptionTransaction {
    async fn claim_pending_purchase(
        &mut self,
        authority: &AuthorityToken,
    ) -> Result<Option<PendingPurchase>, DomainError> {
        let row: Option<PendingPurchaseRow> = sqlx::query_as(CLAIM_PENDING_SQL)
        .bind(authority.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to claim pending purchase"))?;

        row.map(PendingPurchase::try_from).transpose()
    }

    async fn lock_grant(
        &mut self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Option<SubscriptionGrant>, DomainError> {
        sqlx::query(LOCK_GRANT_SLOT_SQL)
            .bind(grant_slot_key(user_id, city_id))
            .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to lock grant slot"))?;

        let row: Option<GrantRow> = sqlx::query_as(&select_grant_sql(true))
        .bind(user_id.as_i64())
        .bind(city_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to fetch grant for update"))?;

        row.map(SubscriptionGrant::try_from).transpose()
    }

    async fn delete_grant(&mut self, id: GrantId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM user_subscriptions WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to delete grant"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::GrantNotFound,
                format!("Grant not found: {}", id),
            ));
        }
        Ok(())
    }

    async fn insert_grant(
        &mut self,
        grant: NewSubscriptionGrant,
    ) -> Result<SubscriptionGrant, DomainError> {
        let row: GrantRow = sqlx::query_as(&insert_grant_sql())
        .bind(grant.user_id.as_i64())
        .bind(grant.city_id.as_i64())
        .bind(grant.plan_id.as_i64())
        .bind(grant.expires_at.as_datetime())
        .bind(grant.created_at.as_datetime())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("Failed to insert grant"))?;

        SubscriptionGrant::try_from(row)
    }

    async fn append_ledger_entry(
        &mut self,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, DomainError> {
        let row: LedgerRow = sqlx::query_as(
            r#"
            INSERT INTO payment_transaction_history
                (user_id, city_id, amount, reference_id, authority, period_months, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, city_id, amount, reference_id, authority, period_months, created_at
            "#,
        )
        .bind(entry.user_id.as_i64())
        .bind(entry.city_id.as_i64())
        .bind(entry.amount)
        .bind(&entry.reference_id)
        .bind(entry.authority.as_str())
        .bind(entry.period.months())
        .bind(entry.created_at.as_datetime())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("Failed to append ledger entry"))?;

        LedgerEntry::try_from(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(db_error("Failed to commit transaction"))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(db_error("Failed to roll back transaction"))
    }
}
