//! PostgreSQL implementation of SubscriptionReader.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{CityId, DomainError, UserId};
use crate::domain::subscription::{LedgerEntry, SubscriptionGrant};
use crate::ports::{GrantWithCityName, SubscriptionReader};

use super::rows::{db_error, GrantRow, LedgerRow};

pub struct PostgresSubscriptionReader {
    pool: PgPool,
}

impl PostgresSubscriptionReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GrantWithCityRow {
    #[sqlx(flatten)]
    grant: GrantRow,
    city_name: String,
}

impl TryFrom<GrantWithCityRow> for GrantWithCityName {
    type Error = DomainError;

    fn try_from(row: GrantWithCityRow) -> Result<Self, Self::Error> {
        Ok(GrantWithCityName {
            grant: SubscriptionGrant::try_from(row.grant)?,
            city_name: row.city_name,
        })
    }
}

#[async_trait]
impl SubscriptionReader for PostgresSubscriptionReader {
    async fn grants_for_user_by_city(
        &self,
        user_id: UserId,
        city_id: CityId,
    ) -> Result<Vec<SubscriptionGrant>, DomainError> {
        let rows: Vec<GrantRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, city_id, plan_id, expires_at, created_at
            FROM user_subscriptions
            WHERE user_id = $1 AND city_id = $2
            "#,
        )
        .bind(user_id.as_i64())
        .bind(city_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch grants"))?;

        rows.into_iter().map(SubscriptionGrant::try_from).collect()
    }

    async fn transaction_history(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, DomainError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, city_id, amount, reference_id, authority, period_months, created_at
            FROM payment_transaction_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch transaction history"))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn grants_with_city_names(
        &self,
        user_id: UserId,
    ) -> Result<Vec<GrantWithCityName>, DomainError> {
        let rows: Vec<GrantWithCityRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.user_id, s.city_id, s.plan_id, s.expires_at, s.created_at,
                   c.name AS city_name
            FROM user_subscriptions s
            JOIN cities c ON c.id = s.city_id
            WHERE s.user_id = $1
            ORDER BY s.expires_at DESC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch subscription list"))?;

        rows.into_iter().map(GrantWithCityName::try_from).collect()
    }
}
