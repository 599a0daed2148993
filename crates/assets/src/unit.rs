//! Units: individually tagged equipment and its custody state machine.
//!
//! ```text
//! Available --checkout--> Deployed --checkin--> Available
//!                         Deployed --mark_overdue--> Overdue --checkin--> Available
//! Available | Pending --archive--> Archived (terminal)
//! ```
//!
//! Every transition is a pure decision: it inspects the current record and
//! returns the [`UnitPatch`] to write, or a [`DomainError`] explaining why the
//! unit is not eligible. Persisting the patch (and the matching audit entry)
//! is the caller's job.

use core::fmt;
use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, Id};

use crate::purchase::PurchaseInfo;
use crate::user::UserId;

pub type UnitId = Id<Unit>;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    #[default]
    Available,
    Deployed,
    Pending,
    Overdue,
    Archived,
}

impl UnitStatus {
    pub const ALL: [UnitStatus; 5] = [
        UnitStatus::Available,
        UnitStatus::Deployed,
        UnitStatus::Pending,
        UnitStatus::Overdue,
        UnitStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Deployed => "deployed",
            UnitStatus::Pending => "pending",
            UnitStatus::Overdue => "overdue",
            UnitStatus::Archived => "archived",
        }
    }

    /// Statuses in which the unit has a holder.
    pub fn is_custody(self) -> bool {
        match self {
            UnitStatus::Deployed | UnitStatus::Overdue => true,
            UnitStatus::Available | UnitStatus::Pending | UnitStatus::Archived => false,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        UnitStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown unit status {s:?}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    /// Unique business key; never changes after creation.
    pub tag: String,
    pub name: String,
    pub category: Option<String>,
    pub serial: Option<String>,
    pub status: UnitStatus,
    pub holder: Option<UserId>,
    pub checkout_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
    /// Free-text device-management tag, cleared on checkin.
    pub external_id: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub purchase: PurchaseInfo,
}

impl Unit {
    pub fn is_in_custody(&self) -> bool {
        self.status.is_custody()
    }

    /// `holder` is set exactly in custody statuses, and an Available unit
    /// carries no checkout residue.
    pub fn custody_invariant_holds(&self) -> bool {
        if self.status.is_custody() != self.holder.is_some() {
            return false;
        }
        if self.status == UnitStatus::Available {
            return self.checkout_date.is_none()
                && self.expected_return_date.is_none()
                && self.external_id.is_none();
        }
        true
    }

    /// Deployed and the expected-return date has passed.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.status == UnitStatus::Deployed
            && self.expected_return_date.is_some_and(|due| due < today)
    }

    pub fn checkout(
        &self,
        holder: UserId,
        today: NaiveDate,
        expected_return_date: Option<NaiveDate>,
    ) -> DomainResult<UnitPatch> {
        match self.status {
            UnitStatus::Available => Ok(UnitPatch {
                status: Some(UnitStatus::Deployed),
                holder: Some(Some(holder)),
                checkout_date: Some(Some(today)),
                expected_return_date: Some(expected_return_date),
                ..UnitPatch::default()
            }),
            UnitStatus::Deployed
            | UnitStatus::Pending
            | UnitStatus::Overdue
            | UnitStatus::Archived => Err(self.not_eligible("checked out")),
        }
    }

    pub fn checkin(&self) -> DomainResult<UnitPatch> {
        match self.status {
            UnitStatus::Deployed | UnitStatus::Overdue => Ok(UnitPatch {
                status: Some(UnitStatus::Available),
                holder: Some(None),
                checkout_date: Some(None),
                expected_return_date: Some(None),
                external_id: Some(None),
                ..UnitPatch::default()
            }),
            UnitStatus::Available | UnitStatus::Pending | UnitStatus::Archived => {
                Err(self.not_eligible("checked in"))
            }
        }
    }

    pub fn mark_overdue(&self) -> DomainResult<UnitPatch> {
        match self.status {
            UnitStatus::Deployed => Ok(UnitPatch {
                status: Some(UnitStatus::Overdue),
                ..UnitPatch::default()
            }),
            UnitStatus::Available
            | UnitStatus::Pending
            | UnitStatus::Overdue
            | UnitStatus::Archived => Err(self.not_eligible("marked overdue")),
        }
    }

    pub fn archive(&self) -> DomainResult<UnitPatch> {
        match self.status {
            UnitStatus::Available | UnitStatus::Pending => Ok(UnitPatch {
                status: Some(UnitStatus::Archived),
                ..UnitPatch::default()
            }),
            UnitStatus::Deployed | UnitStatus::Overdue | UnitStatus::Archived => {
                Err(self.not_eligible("archived"))
            }
        }
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.is_in_custody() {
            return Err(self.not_eligible("deleted"));
        }
        Ok(())
    }

    /// Administrative edits may touch descriptive fields and the external id,
    /// never the custody state itself.
    pub fn revise(&self, patch: UnitPatch) -> DomainResult<Unit> {
        if patch.touches_custody() {
            return Err(DomainError::invalid_transition(
                "custody fields change only through checkout and checkin",
            ));
        }
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        if matches!(patch.external_id, Some(Some(_))) && !self.is_in_custody() {
            return Err(DomainError::validation(format!(
                "unit {} is {}; external id may only be set while it is checked out",
                self.tag, self.status
            )));
        }
        let mut revised = self.clone();
        revised.apply_patch(patch);
        if !revised.custody_invariant_holds() {
            return Err(DomainError::validation(
                "external id may only be set while the unit is checked out",
            ));
        }
        Ok(revised)
    }

    fn not_eligible(&self, action: &str) -> DomainError {
        DomainError::invalid_transition(format!(
            "unit {} is {} and cannot be {action}",
            self.tag, self.status
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub tag: String,
    pub name: String,
    pub category: Option<String>,
    pub serial: Option<String>,
    pub status: UnitStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub purchase: PurchaseInfo,
}

impl NewUnit {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.tag.trim().is_empty() {
            return Err(DomainError::validation("tag cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.status.is_custody() {
            return Err(DomainError::validation(format!(
                "a unit cannot be created as {}; check it out instead",
                self.status
            )));
        }
        Ok(())
    }
}

/// Partial update. Outer `None` = leave untouched; `Some(None)` = clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub serial: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub purchase: Option<PurchaseInfo>,
    pub status: Option<UnitStatus>,
    pub holder: Option<Option<UserId>>,
    pub checkout_date: Option<Option<NaiveDate>>,
    pub expected_return_date: Option<Option<NaiveDate>>,
    pub external_id: Option<Option<String>>,
}

impl UnitPatch {
    pub fn touches_custody(&self) -> bool {
        self.status.is_some()
            || self.holder.is_some()
            || self.checkout_date.is_some()
            || self.expected_return_date.is_some()
    }
}

impl Entity for Unit {
    type Draft = NewUnit;
    type Patch = UnitPatch;

    const KIND: &'static str = "unit";

    fn id(&self) -> UnitId {
        self.id
    }

    fn from_draft(id: UnitId, draft: NewUnit) -> Self {
        Self {
            id,
            tag: draft.tag,
            name: draft.name,
            category: draft.category,
            serial: draft.serial,
            status: draft.status,
            holder: None,
            checkout_date: None,
            expected_return_date: None,
            external_id: None,
            location: draft.location,
            notes: draft.notes,
            purchase: draft.purchase,
        }
    }

    fn apply_patch(&mut self, patch: UnitPatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.category {
            self.category = v;
        }
        if let Some(v) = patch.serial {
            self.serial = v;
        }
        if let Some(v) = patch.location {
            self.location = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.purchase {
            self.purchase = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.holder {
            self.holder = v;
        }
        if let Some(v) = patch.checkout_date {
            self.checkout_date = v;
        }
        if let Some(v) = patch.expected_return_date {
            self.expected_return_date = v;
        }
        if let Some(v) = patch.external_id {
            self.external_id = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_unit(status: UnitStatus) -> Unit {
        let mut draft = NewUnit::new("A-001", "Laptop");
        draft.status = status;
        Unit::from_draft(Id::new(1), draft)
    }

    fn holder() -> UserId {
        Id::new(7)
    }

    fn checked_out(unit: &Unit) -> Unit {
        let mut next = unit.clone();
        next.apply_patch(unit.checkout(holder(), day(2024, 6, 1), Some(day(2025, 1, 1))).unwrap());
        next
    }

    #[test]
    fn checkout_moves_available_unit_into_custody() {
        let unit = checked_out(&test_unit(UnitStatus::Available));
        assert_eq!(unit.status, UnitStatus::Deployed);
        assert_eq!(unit.holder, Some(holder()));
        assert_eq!(unit.checkout_date, Some(day(2024, 6, 1)));
        assert_eq!(unit.expected_return_date, Some(day(2025, 1, 1)));
        assert!(unit.custody_invariant_holds());
    }

    #[test]
    fn checkout_rejects_every_other_status() {
        for status in [
            UnitStatus::Deployed,
            UnitStatus::Pending,
            UnitStatus::Overdue,
            UnitStatus::Archived,
        ] {
            let err = test_unit(status)
                .checkout(holder(), day(2024, 6, 1), None)
                .unwrap_err();
            match err {
                DomainError::InvalidTransition(_) => {}
                other => panic!("expected InvalidTransition for {status}, got {other:?}"),
            }
        }
    }

    #[test]
    fn checkin_clears_checkout_residue_including_external_id() {
        let mut unit = checked_out(&test_unit(UnitStatus::Available));
        unit.external_id = Some("KNOX-1".into());
        unit.apply_patch(unit.checkin().unwrap());
        assert_eq!(unit, test_unit(UnitStatus::Available));
    }

    #[test]
    fn checkin_accepts_overdue_units() {
        let mut unit = checked_out(&test_unit(UnitStatus::Available));
        unit.apply_patch(unit.mark_overdue().unwrap());
        assert_eq!(unit.status, UnitStatus::Overdue);
        assert_eq!(unit.holder, Some(holder()));
        unit.apply_patch(unit.checkin().unwrap());
        assert_eq!(unit.status, UnitStatus::Available);
        assert!(unit.custody_invariant_holds());
    }

    #[test]
    fn checkin_rejects_units_not_in_custody() {
        assert!(test_unit(UnitStatus::Available).checkin().is_err());
        assert!(test_unit(UnitStatus::Archived).checkin().is_err());
    }

    #[test]
    fn past_due_only_for_deployed_units_after_expected_return() {
        let unit = checked_out(&test_unit(UnitStatus::Available));
        assert!(!unit.is_past_due(day(2025, 1, 1)));
        assert!(unit.is_past_due(day(2025, 1, 2)));
        assert!(!test_unit(UnitStatus::Available).is_past_due(day(2030, 1, 1)));
    }

    #[test]
    fn archive_is_one_way() {
        let mut unit = test_unit(UnitStatus::Pending);
        unit.apply_patch(unit.archive().unwrap());
        assert_eq!(unit.status, UnitStatus::Archived);
        assert!(unit.archive().is_err());
        assert!(unit.checkout(holder(), day(2024, 1, 1), None).is_err());
    }

    #[test]
    fn revise_refuses_custody_fields() {
        let unit = test_unit(UnitStatus::Available);
        let err = unit
            .revise(UnitPatch {
                status: Some(UnitStatus::Deployed),
                ..UnitPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn revise_sets_external_id_only_in_custody() {
        let patch = UnitPatch {
            external_id: Some(Some("KNOX-9".into())),
            ..UnitPatch::default()
        };
        assert!(matches!(
            test_unit(UnitStatus::Available).revise(patch.clone()),
            Err(DomainError::Validation(_))
        ));
        let revised = checked_out(&test_unit(UnitStatus::Available)).revise(patch).unwrap();
        assert_eq!(revised.external_id.as_deref(), Some("KNOX-9"));
    }

    #[test]
    fn revise_refuses_external_id_on_pending_and_archived_units() {
        let patch = UnitPatch {
            external_id: Some(Some("KNOX-7".into())),
            ..UnitPatch::default()
        };
        for status in [UnitStatus::Pending, UnitStatus::Archived] {
            let unit = test_unit(status);
            match unit.revise(patch.clone()) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected Validation for {status}, got {other:?}"),
            }
        }

        let mut overdue = checked_out(&test_unit(UnitStatus::Available));
        overdue.apply_patch(overdue.mark_overdue().unwrap());
        assert!(overdue.revise(patch).is_ok());
    }

    #[test]
    fn revise_may_clear_external_id_outside_custody() {
        let cleared = test_unit(UnitStatus::Pending)
            .revise(UnitPatch {
                external_id: Some(None),
                ..UnitPatch::default()
            })
            .unwrap();
        assert_eq!(cleared.external_id, None);
    }

    #[test]
    fn new_unit_cannot_start_in_custody() {
        let mut draft = NewUnit::new("A-002", "Monitor");
        draft.status = UnitStatus::Deployed;
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
        draft.status = UnitStatus::Pending;
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn status_text_round_trips() {
        for status in UnitStatus::ALL {
            assert_eq!(status.as_str().parse::<UnitStatus>().unwrap(), status);
        }
        assert!("lost".parse::<UnitStatus>().is_err());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Checkout,
        Checkin,
        MarkOverdue,
        Archive,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            4 => Just(Step::Checkout),
            4 => Just(Step::Checkin),
            2 => Just(Step::MarkOverdue),
            1 => Just(Step::Archive),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of transitions is attempted, accepted
        /// patches keep the custody invariant and rejected ones change nothing.
        #[test]
        fn transitions_preserve_custody_invariant(steps in prop::collection::vec(step(), 0..40)) {
            let mut unit = test_unit(UnitStatus::Available);
            for s in steps {
                let decision = match s {
                    Step::Checkout => unit.checkout(holder(), day(2024, 6, 1), None),
                    Step::Checkin => unit.checkin(),
                    Step::MarkOverdue => unit.mark_overdue(),
                    Step::Archive => unit.archive(),
                };
                if let Ok(patch) = decision {
                    unit.apply_patch(patch);
                }
                prop_assert!(unit.custody_invariant_holds());
            }
        }
    }
}
