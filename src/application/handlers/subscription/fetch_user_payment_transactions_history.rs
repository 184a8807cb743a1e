//! FetchUserPaymentTransactionsHistoryHandler - Query handler for a user's ledger.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::subscription::{LedgerEntry, SubscriptionError};
use crate::ports::SubscriptionReader;

#[derive(Debug, Clone)]
pub struct FetchUserPaymentTransactionsHistoryQuery {
    pub user_id: UserId,
}

/// Ledger entries, newest first.
pub type FetchUserPaymentTransactionsHistoryResult = Vec<LedgerEntry>;

pub struct FetchUserPaymentTransactionsHistoryHandler {
    reader: Arc<dyn SubscriptionReader>,
}

impl FetchUserPaymentTransactionsHistoryHandler {
    pub fn new(reader: Arc<dyn SubscriptionReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: FetchUserPaymentTransactionsHistoryQuery,
    ) -> Result<FetchUserPaymentTransactionsHistoryResult, SubscriptionError> {
        Ok(self.reader.transaction_history(query.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCatalog, InMemorySubscriptionReader, InMemorySubscriptionStore,
    };
    use crate::domain::catalog::PlanPeriod;
    use crate::domain::foundation::{AuthorityToken, CityId};
    use crate::domain::subscription::NewLedgerEntry;
    use crate::ports::SubscriptionStore;

    #[tokio::test]
    async fn history_survives_grant_replacement() {
        let store = InMemorySubscriptionStore::new();
        let reader = InMemorySubscriptionReader::new(store.clone(), InMemoryCatalog::new());
        let user_id = UserId::new(4).unwrap();

        for n in 1..=2 {
            let mut tx = store.begin().await.unwrap();
            tx.append_ledger_entry(NewLedgerEntry::new(
                user_id,
                CityId::new(1).unwrap(),
                1000,
                format!("ref-{}", n),
                AuthorityToken::new(format!("A{}", n)).unwrap(),
                PlanPeriod::SixMonths,
            ))
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }

        let handler = FetchUserPaymentTransactionsHistoryHandler::new(Arc::new(reader));
        let history = handler
            .handle(FetchUserPaymentTransactionsHistoryQuery { user_id })
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.period == PlanPeriod::SixMonths));
    }

    #[tokio::test]
    async fn user_without_payments_has_empty_history() {
        let store = InMemorySubscriptionStore::new();
        let reader = InMemorySubscriptionReader::new(store, InMemoryCatalog::new());
        let handler = FetchUserPaymentTransactionsHistoryHandler::new(Arc::new(reader));

        let history = handler
            .handle(FetchUserPaymentTransactionsHistoryQuery {
                user_id: UserId::new(9).unwrap(),
            })
            .await
            .unwrap();

        assert!(history.is_empty());
    }
}
