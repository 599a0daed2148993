//! Bulk consumable stock and the quantities handed out from it.
//!
//! On-hand quantity is debited when stock is assigned and credited back by
//! exactly the assigned amount when that assignment is returned. The amount
//! lives on the assignment row, so a return can never restore more or less
//! than its own grant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, Id, Quantity};

use crate::assignment::{AssignmentStatus, require_assignee};
use crate::purchase::PurchaseInfo;

pub type ConsumableId = Id<Consumable>;
pub type ConsumableAssignmentId = Id<ConsumableAssignment>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub id: ConsumableId,
    pub name: String,
    pub category: Option<String>,
    pub item_no: Option<String>,
    pub quantity: Quantity,
    /// Reorder threshold; informational only.
    pub min_quantity: Quantity,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub purchase: PurchaseInfo,
}

impl Consumable {
    pub fn is_below_minimum(&self) -> bool {
        self.quantity < self.min_quantity
    }

    /// Debit stock for a grant. Nothing is debited unless the whole request
    /// can be met.
    pub fn grant(
        &self,
        request: StockRequest,
        today: NaiveDate,
    ) -> DomainResult<(ConsumablePatch, NewConsumableAssignment)> {
        require_assignee(&request.assignee)?;
        if request.quantity.is_zero() {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let remaining = self.quantity.checked_sub(request.quantity).ok_or_else(|| {
            DomainError::capacity(format!(
                "{} of {:?} requested but only {} on hand",
                request.quantity, self.name, self.quantity
            ))
        })?;

        let patch = ConsumablePatch {
            quantity: Some(remaining),
            ..ConsumablePatch::default()
        };
        let draft = NewConsumableAssignment {
            consumable_id: self.id,
            assignee: request.assignee,
            serial: request.serial,
            external_id: request.external_id,
            quantity: request.quantity,
            assigned_date: today,
            notes: request.notes,
        };
        Ok((patch, draft))
    }

    /// Credit back the quantity carried by a returned assignment.
    pub fn restock(&self, returned: Quantity) -> DomainResult<ConsumablePatch> {
        let quantity = self
            .quantity
            .checked_add(returned)
            .ok_or_else(|| {
                DomainError::validation(format!("restocking {:?} overflows", self.name))
            })?;
        Ok(ConsumablePatch {
            quantity: Some(quantity),
            ..ConsumablePatch::default()
        })
    }

    pub fn ensure_deletable(&self, outstanding: usize) -> DomainResult<()> {
        if outstanding > 0 {
            return Err(DomainError::invalid_transition(format!(
                "{:?} has {outstanding} outstanding assignments",
                self.name
            )));
        }
        Ok(())
    }

    pub fn revise(&self, patch: ConsumablePatch) -> DomainResult<Consumable> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        let mut revised = self.clone();
        revised.apply_patch(patch);
        Ok(revised)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConsumable {
    pub name: String,
    pub category: Option<String>,
    pub item_no: Option<String>,
    pub quantity: Quantity,
    pub min_quantity: Quantity,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub purchase: PurchaseInfo,
}

impl NewConsumable {
    pub fn new(name: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            category: None,
            item_no: None,
            quantity,
            min_quantity: Quantity::ONE,
            location: None,
            notes: None,
            purchase: PurchaseInfo::default(),
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
pub struct ConsumablePatch {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub item_no: Option<Option<String>>,
    pub quantity: Option<Quantity>,
    pub min_quantity: Option<Quantity>,
    pub location: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub purchase: Option<PurchaseInfo>,
}

impl Entity for Consumable {
    type Draft = NewConsumable;
    type Patch = ConsumablePatch;

    const KIND: &'static str = "consumable";

    fn id(&self) -> ConsumableId {
        self.id
    }

    fn from_draft(id: ConsumableId, draft: NewConsumable) -> Self {
        Self {
            id,
            name: draft.name,
            category: draft.category,
            item_no: draft.item_no,
            quantity: draft.quantity,
            min_quantity: draft.min_quantity,
            location: draft.location,
            notes: draft.notes,
            purchase: draft.purchase,
        }
    }

    fn apply_patch(&mut self, patch: ConsumablePatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.category {
            self.category = v;
        }
        if let Some(v) = patch.item_no {
            self.item_no = v;
        }
        if let Some(v) = patch.quantity {
            self.quantity = v;
        }
        if let Some(v) = patch.min_quantity {
            self.min_quantity = v;
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
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stock assignments
// ─────────────────────────────────────────────────────────────────────────────

/// Caller input for handing out stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub assignee: String,
    /// One item unless the caller asks for more.
    #[serde(default = "one_item")]
    pub quantity: Quantity,
    pub serial: Option<String>,
    /// Device-management tag of the receiving device, if any.
    pub external_id: Option<String>,
    pub notes: Option<String>,
}

fn one_item() -> Quantity {
    Quantity::ONE
}

impl StockRequest {
    /// A single item for `assignee`.
    pub fn one(assignee: impl Into<String>) -> Self {
        Self::to(assignee, one_item())
    }

    pub fn to(assignee: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            assignee: assignee.into(),
            quantity,
            serial: None,
            external_id: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumableAssignment {
    pub id: ConsumableAssignmentId,
    pub consumable_id: ConsumableId,
    pub assignee: String,
    pub serial: Option<String>,
    pub external_id: Option<String>,
    pub quantity: Quantity,
    pub assigned_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
}

impl ConsumableAssignment {
    pub fn mark_returned(&self, today: NaiveDate) -> DomainResult<ConsumableAssignmentPatch> {
        match self.status {
            AssignmentStatus::Assigned => Ok(ConsumableAssignmentPatch {
                status: Some(AssignmentStatus::Returned),
                returned_date: Some(Some(today)),
            }),
            AssignmentStatus::Returned => Err(DomainError::invalid_transition(format!(
                "stock assignment {} was already returned",
                self.id
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConsumableAssignment {
    pub consumable_id: ConsumableId,
    pub assignee: String,
    pub serial: Option<String>,
    pub external_id: Option<String>,
    pub quantity: Quantity,
    pub assigned_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumableAssignmentPatch {
    pub status: Option<AssignmentStatus>,
    pub returned_date: Option<Option<NaiveDate>>,
}

impl Entity for ConsumableAssignment {
    type Draft = NewConsumableAssignment;
    type Patch = ConsumableAssignmentPatch;

    const KIND: &'static str = "consumable assignment";

    fn id(&self) -> ConsumableAssignmentId {
        self.id
    }

    fn from_draft(id: ConsumableAssignmentId, draft: NewConsumableAssignment) -> Self {
        Self {
            id,
            consumable_id: draft.consumable_id,
            assignee: draft.assignee,
            serial: draft.serial,
            external_id: draft.external_id,
            quantity: draft.quantity,
            assigned_date: draft.assigned_date,
            returned_date: None,
            status: AssignmentStatus::Assigned,
            notes: draft.notes,
        }
    }

    fn apply_patch(&mut self, patch: ConsumableAssignmentPatch) {
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.returned_date {
            self.returned_date = v;
        }
    }
}
