//! Read-only summaries derived from inventory records.

use serde::{Deserialize, Serialize};

use crate::unit::{Unit, UnitStatus};

/// Unit counts partitioned by status.
///
/// Every unit lands in exactly one bucket, so the buckets always sum to
/// `total`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStats {
    pub total: usize,
    /// Units in `Deployed`.
    pub checked_out: usize,
    pub available: usize,
    pub pending: usize,
    pub overdue: usize,
    pub archived: usize,
}

impl UnitStats {
    /// Single pass over the units.
    pub fn tally<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Self {
        let mut stats = UnitStats::default();
        for unit in units {
            stats.total += 1;
            match unit.status {
                UnitStatus::Deployed => stats.checked_out += 1,
                UnitStatus::Available => stats.available += 1,
                UnitStatus::Pending => stats.pending += 1,
                UnitStatus::Overdue => stats.overdue += 1,
                UnitStatus::Archived => stats.archived += 1,
            }
        }
        stats
    }

    pub fn partition_sum(&self) -> usize {
        self.checked_out + self.available + self.pending + self.overdue + self.archived
    }
}

/// Seat utilization of one license.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatUsage {
    pub total: u32,
    pub assigned: usize,
    /// Zero when over-allocated under an advisory policy.
    pub available: usize,
}

impl SeatUsage {
    pub fn new(total: u32, assigned: usize) -> Self {
        Self {
            total,
            assigned,
            available: (total as usize).saturating_sub(assigned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::NewUnit;
    use proptest::prelude::*;
    use stockroom_core::{Entity, Id};

    fn unit_with(id: i64, status: UnitStatus) -> Unit {
        let mut unit = Unit::from_draft(Id::new(id), NewUnit::new(format!("T-{id}"), "Thing"));
        unit.status = status;
        unit
    }

    fn status() -> impl Strategy<Value = UnitStatus> {
        prop::sample::select(UnitStatus::ALL.to_vec())
    }

    #[test]
    fn empty_inventory_is_all_zero() {
        assert_eq!(UnitStats::tally(&Vec::<Unit>::new()), UnitStats::default());
    }

    #[test]
    fn counts_each_status_bucket() {
        let units = vec![
            unit_with(1, UnitStatus::Available),
            unit_with(2, UnitStatus::Deployed),
            unit_with(3, UnitStatus::Deployed),
            unit_with(4, UnitStatus::Overdue),
            unit_with(5, UnitStatus::Archived),
        ];
        let stats = UnitStats::tally(&units);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.checked_out, 2);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.archived, 1);
    }

    #[test]
    fn seat_usage_saturates_when_over_allocated() {
        assert_eq!(SeatUsage::new(5, 2).available, 3);
        assert_eq!(SeatUsage::new(1, 3).available, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: status buckets are mutually exclusive and exhaustive.
        #[test]
        fn partitions_sum_to_total(statuses in prop::collection::vec(status(), 0..100)) {
            let units: Vec<Unit> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| unit_with(i as i64 + 1, *s))
                .collect();
            let stats = UnitStats::tally(&units);
            prop_assert_eq!(stats.total, units.len());
            prop_assert_eq!(stats.partition_sum(), stats.total);
        }
    }
}
