//! Audit Ledger facade.
//!
//! Append and read only. Lifecycle operations append through their own
//! transaction; this type serves callers that record events outside a
//! lifecycle operation and the read-side queries.

use tracing::instrument;

use stockroom_assets::{Activity, ActivityFilter, ItemRef, NewActivity, UserId};

use crate::store::{ActivitySink, InventoryStore, StoreError, StoreTx};

#[derive(Debug, Clone)]
pub struct AuditLedger<S> {
    store: S,
}

impl<S: InventoryStore> AuditLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Store one row. The id, and the timestamp when none was given, come
    /// from the store.
    #[instrument(skip_all, fields(action = %activity.action), err)]
    pub async fn append(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        let mut tx = self.store.begin().await?;
        let stored = tx.append(activity).await?;
        tx.commit().await?;
        Ok(stored)
    }

    /// Rows matching `filter`, oldest first.
    pub async fn query(&self, filter: ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        let mut tx = self.store.begin().await?;
        tx.activities(filter).await
    }

    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Activity>, StoreError> {
        self.query(ActivityFilter::ByUser(user_id)).await
    }

    pub async fn list_by_item(
        &self,
        item: impl Into<ItemRef>,
    ) -> Result<Vec<Activity>, StoreError> {
        self.query(ActivityFilter::ByItem(item.into())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stockroom_assets::{Action, LicenseId, UnitId};
    use stockroom_core::Id;

    use crate::store::InMemoryInventoryStore;

    #[tokio::test]
    async fn query_orders_by_timestamp_then_insertion() {
        let ledger = AuditLedger::new(InMemoryInventoryStore::new());
        let unit: UnitId = Id::new(1);
        let late = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        let a = ledger.append(NewActivity::new(Action::Update, unit).at(late)).await.unwrap();
        let b = ledger.append(NewActivity::new(Action::Create, unit).at(early)).await.unwrap();
        let c = ledger.append(NewActivity::new(Action::Checkout, unit).at(late)).await.unwrap();

        let rows = ledger.list_by_item(unit).await.unwrap();
        let ids: Vec<_> = rows.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id, c.id]);
    }

    #[tokio::test]
    async fn item_queries_do_not_mix_kinds() {
        let ledger = AuditLedger::new(InMemoryInventoryStore::new());
        let unit: UnitId = Id::new(5);
        let license: LicenseId = Id::new(5);
        ledger.append(NewActivity::new(Action::Create, unit)).await.unwrap();
        ledger.append(NewActivity::new(Action::Create, license)).await.unwrap();

        let rows = ledger.list_by_item(license).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].item, ItemRef::from(license));
    }

    #[tokio::test]
    async fn unknown_acting_user_is_a_constraint_failure() {
        let ledger = AuditLedger::new(InMemoryInventoryStore::new());
        let unit: UnitId = Id::new(1);
        let err = ledger
            .append(NewActivity::new(Action::Create, unit).by(Some(Id::new(42))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(ledger.query(ActivityFilter::All).await.unwrap().is_empty());
    }
}
