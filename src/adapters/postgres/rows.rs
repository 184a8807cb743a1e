//! Row types shared by the PostgreSQL adapters and their conversions.

use chrono::{DateTime, Utc};

use crate::domain::catalog::PlanPeriod;
use crate::domain::foundation::{
    AuthorityToken, CityId, DomainError, ErrorCode, GrantId, LedgerEntryId, PlanId, Timestamp,
    UserId,
};
use crate::domain::subscription::{LedgerEntry, PendingPurchase, SubscriptionGrant};

/// Maps a sqlx error into a `DatabaseError` with context.
pub(super) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn corrupt(column: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} in database: {}", column, e),
    )
}

pub(super) fn user_id(raw: i64) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| corrupt("user_id", e))
}

pub(super) fn city_id(raw: i64) -> Result<CityId, DomainError> {
    CityId::new(raw).map_err(|e| corrupt("city_id", e))
}

pub(super) fn plan_id(raw: i64) -> Result<PlanId, DomainError> {
    PlanId::new(raw).map_err(|e| corrupt("plan_id", e))
}

pub(super) fn period(months: i32) -> Result<PlanPeriod, DomainError> {
    PlanPeriod::try_from(months).map_err(|e| corrupt("period_months", e))
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PendingPurchaseRow {
    pub authority: String,
    pub user_id: i64,
    pub city_id: i64,
    pub plan_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PendingPurchaseRow> for PendingPurchase {
    type Error = DomainError;

    fn try_from(row: PendingPurchaseRow) -> Result<Self, Self::Error> {
        Ok(PendingPurchase {
            authority: AuthorityToken::new(row.authority).map_err(|e| corrupt("authority", e))?,
            user_id: user_id(row.user_id)?,
            city_id: city_id(row.city_id)?,
            plan_id: plan_id(row.plan_id)?,
            amount: row.amount,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct GrantRow {
    pub id: i64,
    pub user_id: i64,
    pub city_id: i64,
    pub plan_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<GrantRow> for SubscriptionGrant {
    type Error = DomainError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionGrant {
            id: GrantId::new(row.id).map_err(|e| corrupt("id", e))?,
            user_id: user_id(row.user_id)?,
            city_id: city_id(row.city_id)?,
            plan_id: plan_id(row.plan_id)?,
            expires_at: Timestamp::from_datetime(row.expires_at),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct LedgerRow {
    pub id: i64,
    pub user_id: i64,
    pub city_id: i64,
    pub amount: i64,
    pub reference_id: String,
    pub authority: String,
    pub period_months: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = DomainError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: LedgerEntryId::new(row.id).map_err(|e| corrupt("id", e))?,
            user_id: user_id(row.user_id)?,
            city_id: city_id(row.city_id)?,
            amount: row.amount,
            reference_id: row.reference_id,
            authority: AuthorityToken::new(row.authority).map_err(|e| corrupt("authority", e))?,
            period: period(row.period_months)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}
