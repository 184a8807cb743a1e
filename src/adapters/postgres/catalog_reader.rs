//! PostgreSQL implementation of CatalogReader.
//!
//! Reads the `subscription_plans`, `cities` and `users` tables owned by the
//! back office's catalog and account subsystems.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::catalog::{City, CityTier, SubscriptionPlan, UserProfile};
use crate::domain::foundation::{CityId, DomainError, ErrorCode, PlanId, UserId};
use crate::ports::CatalogReader;

use super::rows::{city_id, db_error, period};

pub struct PostgresCatalogReader {
    pool: PgPool,
}

impl PostgresCatalogReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: i64,
    period_months: i32,
    price: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CityRow {
    id: i64,
    name: String,
    tier: String,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    home_city_id: Option<i64>,
}

fn parse_tier(s: &str) -> Result<CityTier, DomainError> {
    CityTier::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid tier value: {}", s),
        )
    })
}

#[async_trait]
impl CatalogReader for PostgresCatalogReader {
    async fn find_plan(&self, id: PlanId) -> Result<Option<SubscriptionPlan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            "SELECT id, period_months, price FROM subscription_plans WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch plan"))?;

        row.map(|r| -> Result<SubscriptionPlan, DomainError> {
            SubscriptionPlan::new(id, period(r.period_months)?, r.price).map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid plan {}: {}", r.id, e),
                )
            })
        })
        .transpose()
    }

    async fn find_city(&self, id: CityId) -> Result<Option<City>, DomainError> {
        let row: Option<CityRow> = sqlx::query_as("SELECT id, name, tier FROM cities WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch city"))?;

        row.map(|r| -> Result<City, DomainError> {
            Ok(City::new(city_id(r.id)?, r.name, parse_tier(&r.tier)?))
        })
        .transpose()
    }

    async fn find_user_profile(&self, id: UserId) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT home_city_id FROM users WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch user"))?;

        row.map(|r| -> Result<UserProfile, DomainError> {
            Ok(UserProfile::new(id, r.home_city_id.map(city_id).transpose()?))
        })
        .transpose()
    }
}
