//! Software licenses and the seats granted against them.

use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, Id};

use crate::assignment::{AssignmentStatus, require_assignee};
use crate::purchase::PurchaseInfo;

pub type LicenseId = Id<License>;
pub type LicenseAssignmentId = Id<LicenseAssignment>;

/// Whether the seat ceiling blocks new grants or only warns about them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatPolicy {
    #[default]
    Enforced,
    Advisory,
}

impl FromStr for SeatPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforced" => Ok(SeatPolicy::Enforced),
            "advisory" => Ok(SeatPolicy::Advisory),
            other => Err(DomainError::validation(format!("unknown seat policy {other:?}"))),
        }
    }
}

/// Outcome of a seat-ceiling check that did not block the grant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SeatDecision {
    WithinCeiling,
    /// Only produced under [`SeatPolicy::Advisory`].
    OverAllocated { seats: u32, active: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    pub name: String,
    pub product_key: Option<String>,
    /// Total seat count.
    pub seats: u32,
    pub licensed_to: Option<String>,
    pub license_email: Option<String>,
    pub reassignable: bool,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub purchase: PurchaseInfo,
}

impl License {
    /// Check whether one more seat may be granted while `active` seats are held.
    pub fn check_seat_ceiling(
        &self,
        active: usize,
        policy: SeatPolicy,
    ) -> DomainResult<SeatDecision> {
        if active < self.seats as usize {
            return Ok(SeatDecision::WithinCeiling);
        }
        match policy {
            SeatPolicy::Enforced => Err(DomainError::capacity(format!(
                "license {:?} has all {} seats assigned",
                self.name, self.seats
            ))),
            SeatPolicy::Advisory => Ok(SeatDecision::OverAllocated {
                seats: self.seats,
                active,
            }),
        }
    }

    pub fn grant_seat(
        &self,
        request: SeatRequest,
        today: NaiveDate,
    ) -> DomainResult<NewLicenseAssignment> {
        require_assignee(&request.assignee)?;
        Ok(NewLicenseAssignment {
            license_id: self.id,
            assignee: request.assignee,
            serial: request.serial,
            notes: request.notes,
            assigned_date: today,
        })
    }

    /// Administrative edit. Under an enforced policy the seat count may not
    /// drop below the seats currently held.
    pub fn revise(
        &self,
        patch: LicensePatch,
        active: usize,
        policy: SeatPolicy,
    ) -> DomainResult<License> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        let mut revised = self.clone();
        revised.apply_patch(patch);
        if policy == SeatPolicy::Enforced && (revised.seats as usize) < active {
            return Err(DomainError::capacity(format!(
                "license {:?} has {active} seats assigned; cannot shrink to {}",
                revised.name, revised.seats
            )));
        }
        Ok(revised)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLicense {
    pub name: String,
    pub product_key: Option<String>,
    pub seats: u32,
    pub licensed_to: Option<String>,
    pub license_email: Option<String>,
    pub reassignable: bool,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub purchase: PurchaseInfo,
}

impl NewLicense {
    pub fn new(name: impl Into<String>, seats: u32) -> Self {
        Self {
            name: name.into(),
            seats,
            reassignable: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePatch {
    pub name: Option<String>,
    pub product_key: Option<Option<String>>,
    pub seats: Option<u32>,
    pub licensed_to: Option<Option<String>>,
    pub license_email: Option<Option<String>>,
    pub reassignable: Option<bool>,
    pub expiry_date: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
    pub purchase: Option<PurchaseInfo>,
}

impl Entity for License {
    type Draft = NewLicense;
    type Patch = LicensePatch;

    const KIND: &'static str = "license";

    fn id(&self) -> LicenseId {
        self.id
    }

    fn from_draft(id: LicenseId, draft: NewLicense) -> Self {
        Self {
            id,
            name: draft.name,
            product_key: draft.product_key,
            seats: draft.seats,
            licensed_to: draft.licensed_to,
            license_email: draft.license_email,
            reassignable: draft.reassignable,
            expiry_date: draft.expiry_date,
            notes: draft.notes,
            purchase: draft.purchase,
        }
    }

    fn apply_patch(&mut self, patch: LicensePatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.product_key {
            self.product_key = v;
        }
        if let Some(v) = patch.seats {
            self.seats = v;
        }
        if let Some(v) = patch.licensed_to {
            self.licensed_to = v;
        }
        if let Some(v) = patch.license_email {
            self.license_email = v;
        }
        if let Some(v) = patch.reassignable {
            self.reassignable = v;
        }
        if let Some(v) = patch.expiry_date {
            self.expiry_date = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.purchase {
            self.purchase = v;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Seat assignments
// ─────────────────────────────────────────────────────────────────────────────

/// Caller input for granting a seat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRequest {
    /// Free-text identity; not necessarily a known user.
    pub assignee: String,
    pub serial: Option<String>,
    pub notes: Option<String>,
}

impl SeatRequest {
    pub fn to(assignee: impl Into<String>) -> Self {
        Self {
            assignee: assignee.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseAssignment {
    pub id: LicenseAssignmentId,
    pub license_id: LicenseId,
    pub assignee: String,
    pub serial: Option<String>,
    pub notes: Option<String>,
    pub assigned_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
    pub status: AssignmentStatus,
}

impl LicenseAssignment {
    pub fn revoke(&self, today: NaiveDate) -> DomainResult<LicenseAssignmentPatch> {
        match self.status {
            AssignmentStatus::Assigned => Ok(LicenseAssignmentPatch {
                status: Some(AssignmentStatus::Returned),
                returned_date: Some(Some(today)),
            }),
            AssignmentStatus::Returned => Err(DomainError::invalid_transition(format!(
                "seat {} was already returned",
                self.id
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLicenseAssignment {
    pub license_id: LicenseId,
    pub assignee: String,
    pub serial: Option<String>,
    pub notes: Option<String>,
    pub assigned_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseAssignmentPatch {
    pub status: Option<AssignmentStatus>,
    pub returned_date: Option<Option<NaiveDate>>,
}

impl Entity for LicenseAssignment {
    type Draft = NewLicenseAssignment;
    type Patch = LicenseAssignmentPatch;

    const KIND: &'static str = "license assignment";

    fn id(&self) -> LicenseAssignmentId {
        self.id
    }

    fn from_draft(id: LicenseAssignmentId, draft: NewLicenseAssignment) -> Self {
        Self {
            id,
            license_id: draft.license_id,
            assignee: draft.assignee,
            serial: draft.serial,
            notes: draft.notes,
            assigned_date: draft.assigned_date,
            returned_date: None,
            status: AssignmentStatus::Assigned,
        }
    }

    fn apply_patch(&mut self, patch: LicenseAssignmentPatch) {
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.returned_date {
            self.returned_date = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn test_license(seats: u32) -> License {
        License::from_draft(Id::new(3), NewLicense::new("Office", seats))
    }

    #[test]
    fn enforced_ceiling_blocks_the_extra_seat() {
        let license = test_license(2);
        assert_eq!(
            license.check_seat_ceiling(1, SeatPolicy::Enforced).unwrap(),
            SeatDecision::WithinCeiling
        );
        let err = license.check_seat_ceiling(2, SeatPolicy::Enforced).unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded(_)));
    }

    #[test]
    fn advisory_ceiling_reports_over_allocation() {
        let license = test_license(1);
        assert_eq!(
            license.check_seat_ceiling(3, SeatPolicy::Advisory).unwrap(),
            SeatDecision::OverAllocated { seats: 1, active: 3 }
        );
    }

    #[test]
    fn grant_seat_requires_an_assignee() {
        let license = test_license(5);
        assert!(license.grant_seat(SeatRequest::to("  "), day(1)).is_err());
        let draft = license.grant_seat(SeatRequest::to("alice"), day(1)).unwrap();
        assert_eq!(draft.license_id, license.id);
        assert_eq!(draft.assigned_date, day(1));

        let seat = LicenseAssignment::from_draft(Id::new(1), draft);
        assert_eq!(seat.status, AssignmentStatus::Assigned);
        assert_eq!(seat.returned_date, None);
    }

    #[test]
    fn revoke_happens_once() {
        let license = test_license(5);
        let mut seat = LicenseAssignment::from_draft(
            Id::new(1),
            license.grant_seat(SeatRequest::to("bob"), day(1)).unwrap(),
        );
        seat.apply_patch(seat.revoke(day(9)).unwrap());
        assert_eq!(seat.status, AssignmentStatus::Returned);
        assert_eq!(seat.returned_date, Some(day(9)));
        assert!(matches!(seat.revoke(day(10)), Err(DomainError::InvalidTransition(_))));
    }

    #[test]
    fn revise_cannot_shrink_below_held_seats_when_enforced() {
        let license = test_license(5);
        let shrink = LicensePatch {
            seats: Some(2),
            ..LicensePatch::default()
        };
        assert!(matches!(
            license.revise(shrink.clone(), 3, SeatPolicy::Enforced),
            Err(DomainError::CapacityExceeded(_))
        ));
        assert_eq!(license.revise(shrink, 3, SeatPolicy::Advisory).unwrap().seats, 2);
    }

    #[test]
    fn seat_policy_parses_case_insensitively() {
        assert_eq!("Advisory".parse::<SeatPolicy>().unwrap(), SeatPolicy::Advisory);
        assert_eq!(" enforced ".parse::<SeatPolicy>().unwrap(), SeatPolicy::Enforced);
        assert!("strict".parse::<SeatPolicy>().is_err());
    }
}
