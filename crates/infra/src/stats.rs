//! Stats Aggregator: read-only summaries over the inventory tables.

use stockroom_assets::{Consumable, License, LicenseId, SeatUsage, Unit, UnitStats};

use crate::store::{AssignmentQueries, InventoryStore, Repository, StoreError};

#[derive(Debug, Clone)]
pub struct StatsAggregator<S> {
    store: S,
}

impl<S: InventoryStore> StatsAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unit counts partitioned by status.
    pub async fn unit_stats(&self) -> Result<UnitStats, StoreError> {
        let mut tx = self.store.begin().await?;
        let units = Repository::<Unit>::list(&mut tx).await?;
        Ok(UnitStats::tally(&units))
    }

    /// Consumables whose on-hand quantity is below their minimum.
    pub async fn low_stock(&self) -> Result<Vec<Consumable>, StoreError> {
        let mut tx = self.store.begin().await?;
        let consumables = Repository::<Consumable>::list(&mut tx).await?;
        Ok(consumables.into_iter().filter(Consumable::is_below_minimum).collect())
    }

    /// Seat totals for one license; `None` if it does not exist.
    pub async fn seat_usage(&self, license_id: LicenseId) -> Result<Option<SeatUsage>, StoreError> {
        let mut tx = self.store.begin().await?;
        let Some(license) = Repository::<License>::get(&mut tx, license_id).await? else {
            return Ok(None);
        };
        let assigned = tx
            .license_assignments(license_id)
            .await?
            .iter()
            .filter(|a| a.status.is_active())
            .count();
        Ok(Some(SeatUsage::new(license.seats, assigned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_assets::{NewConsumable, NewUnit, UnitStatus};
    use stockroom_core::Quantity;

    use crate::store::{InMemoryInventoryStore, StoreTx};

    #[tokio::test]
    async fn unit_stats_cover_every_unit_once() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for (tag, status) in [
            ("A-1", UnitStatus::Available),
            ("A-2", UnitStatus::Available),
            ("A-3", UnitStatus::Pending),
            ("A-4", UnitStatus::Archived),
        ] {
            let mut draft = NewUnit::new(tag, "Laptop");
            draft.status = status;
            Repository::<Unit>::insert(&mut tx, draft).await.unwrap();
        }
        tx.commit().await.unwrap();

        let stats = StatsAggregator::new(store).unit_stats().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.available, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.archived, 1);
        assert_eq!(stats.partition_sum(), stats.total);
    }

    #[tokio::test]
    async fn low_stock_lists_only_consumables_under_minimum() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut short = NewConsumable::new("Toner", Quantity::new(1));
        short.min_quantity = Quantity::new(3);
        Repository::<Consumable>::insert(&mut tx, short).await.unwrap();
        Repository::<Consumable>::insert(&mut tx, NewConsumable::new("Paper", Quantity::new(10)))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let low = StatsAggregator::new(store).low_stock().await.unwrap();
        let names: Vec<_> = low.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Toner"]);
    }

    #[tokio::test]
    async fn seat_usage_of_missing_license_is_none() {
        let stats = StatsAggregator::new(InMemoryInventoryStore::new());
        assert_eq!(stats.seat_usage(stockroom_core::Id::new(9)).await.unwrap(), None);
    }
}
