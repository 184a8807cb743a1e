//! Payment ledger entries.
//!
//! Write-once proof of every verified charge. Entries are never updated or
//! deleted, so they outlive the grants they paid for.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::PlanPeriod;
use crate::domain::foundation::{AuthorityToken, CityId, LedgerEntryId, Timestamp, UserId};

/// Persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub user_id: UserId,
    pub city_id: CityId,
    /// Charged amount in the smallest currency unit.
    pub amount: i64,
    /// Gateway reference id returned by verification.
    pub reference_id: String,
    pub authority: AuthorityToken,
    pub period: PlanPeriod,
    pub created_at: Timestamp,
}

/// Ledger entry awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub city_id: CityId,
    pub amount: i64,
    pub reference_id: String,
    pub authority: AuthorityToken,
    pub period: PlanPeriod,
    pub created_at: Timestamp,
}

impl NewLedgerEntry {
    pub fn new(
        user_id: UserId,
        city_id: CityId,
        amount: i64,
        reference_id: impl Into<String>,
        authority: AuthorityToken,
        period: PlanPeriod,
    ) -> Self {
        Self {
            user_id,
            city_id,
            amount,
            reference_id: reference_id.into(),
            authority,
            period,
            created_at: Timestamp::now(),
        }
    }

    /// Attaches the store-assigned id.
    pub fn with_id(self, id: LedgerEntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            user_id: self.user_id,
            city_id: self.city_id,
            amount: self.amount,
            reference_id: self.reference_id,
            authority: self.authority,
            period: self.period,
            created_at: self.created_at,
        }
    }
}
