//! Spare hardware kept in bulk: internal components (RAM, drives, cards) and
//! peripherals handed out as accessories.
//!
//! Both are counted stock without custody tracking. Only administrative
//! edits change them, and every edit is audited by the caller.

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, Id, Quantity};

use crate::purchase::PurchaseInfo;

pub type ComponentId = Id<Component>;
pub type AccessoryId = Id<Accessory>;

fn require_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Components
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    pub category: Option<String>,
    pub serial: Option<String>,
    pub quantity: Quantity,
    pub min_quantity: Quantity,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub manufacturer: Option<String>,
    pub purchase: PurchaseInfo,
}

impl Component {
    pub fn is_below_minimum(&self) -> bool {
        self.quantity < self.min_quantity
    }

    pub fn revise(&self, patch: ComponentPatch) -> DomainResult<Component> {
        if let Some(name) = &patch.name {
            require_name(name)?;
        }
        let mut revised = self.clone();
        revised.apply_patch(patch);
        Ok(revised)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComponent {
    pub name: String,
    pub category: Option<String>,
    pub serial: Option<String>,
    pub quantity: Quantity,
    pub min_quantity: Quantity,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub manufacturer: Option<String>,
    pub purchase: PurchaseInfo,
}

impl NewComponent {
    /// One component on hand, reorder at one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            serial: None,
            quantity: Quantity::ONE,
            min_quantity: Quantity::ONE,
            location: None,
            notes: None,
            manufacturer: None,
            purchase: PurchaseInfo::default(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPatch {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub serial: Option<Option<String>>,
    pub quantity: Option<Quantity>,
    pub min_quantity: Option<Quantity>,
    pub location: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub manufacturer: Option<Option<String>>,
    pub purchase: Option<PurchaseInfo>,
}

impl Entity for Component {
    type Draft = NewComponent;
    type Patch = ComponentPatch;

    const KIND: &'static str = "component";

    fn id(&self) -> ComponentId {
        self.id
    }

    fn from_draft(id: ComponentId, draft: NewComponent) -> Self {
        Self {
            id,
            name: draft.name,
            category: draft.category,
            serial: draft.serial,
            quantity: draft.quantity,
            min_quantity: draft.min_quantity,
            location: draft.location,
            notes: draft.notes,
            manufacturer: draft.manufacturer,
            purchase: draft.purchase,
        }
    }

    fn apply_patch(&mut self, patch: ComponentPatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.category {
            self.category = v;
        }
        if let Some(v) = patch.serial {
            self.serial = v;
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
        if let Some(v) = patch.manufacturer {
            self.manufacturer = v;
        }
        if let Some(v) = patch.purchase {
            self.purchase = v;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accessories
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessory {
    pub id: AccessoryId,
    pub name: String,
    /// Free-text kind, e.g. "keyboard" or "docking station".
    pub accessory_type: Option<String>,
    pub serial: Option<String>,
    pub quantity: Quantity,
    pub min_quantity: Quantity,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub manufacturer: Option<String>,
    pub purchase: PurchaseInfo,
}

impl Accessory {
    pub fn is_below_minimum(&self) -> bool {
        self.quantity < self.min_quantity
    }

    pub fn revise(&self, patch: AccessoryPatch) -> DomainResult<Accessory> {
        if let Some(name) = &patch.name {
            require_name(name)?;
        }
        let mut revised = self.clone();
        revised.apply_patch(patch);
        Ok(revised)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccessory {
    pub name: String,
    pub accessory_type: Option<String>,
    pub serial: Option<String>,
    pub quantity: Quantity,
    pub min_quantity: Quantity,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub manufacturer: Option<String>,
    pub purchase: PurchaseInfo,
}

impl NewAccessory {
    pub fn new(name: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            accessory_type: None,
            serial: None,
            quantity,
            min_quantity: Quantity::ONE,
            location: None,
            notes: None,
            manufacturer: None,
            purchase: PurchaseInfo::default(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        require_name(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryPatch {
    pub name: Option<String>,
    pub accessory_type: Option<Option<String>>,
    pub serial: Option<Option<String>>,
    pub quantity: Option<Quantity>,
    pub min_quantity: Option<Quantity>,
    pub location: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub manufacturer: Option<Option<String>>,
    pub purchase: Option<PurchaseInfo>,
}

impl Entity for Accessory {
    type Draft = NewAccessory;
    type Patch = AccessoryPatch;

    const KIND: &'static str = "accessory";

    fn id(&self) -> AccessoryId {
        self.id
    }

    fn from_draft(id: AccessoryId, draft: NewAccessory) -> Self {
        Self {
            id,
            name: draft.name,
            accessory_type: draft.accessory_type,
            serial: draft.serial,
            quantity: draft.quantity,
            min_quantity: draft.min_quantity,
            location: draft.location,
            notes: draft.notes,
            manufacturer: draft.manufacturer,
            purchase: draft.purchase,
        }
    }

    fn apply_patch(&mut self, patch: AccessoryPatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.accessory_type {
            self.accessory_type = v;
        }
        if let Some(v) = patch.serial {
            self.serial = v;
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
        if let Some(v) = patch.manufacturer {
            self.manufacturer = v;
        }
        if let Some(v) = patch.purchase {
            self.purchase = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected_on_create_and_edit() {
        assert!(matches!(NewComponent::new("  ").validate(), Err(DomainError::Validation(_))));
        assert!(NewAccessory::new("", Quantity::ONE).validate().is_err());

        let ram = Component::from_draft(Id::new(1), NewComponent::new("16GB DDR5"));
        let err = ram
            .revise(ComponentPatch {
                name: Some(" ".into()),
                ..ComponentPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn revise_applies_only_the_given_fields() {
        let mut draft = NewAccessory::new("USB-C dock", Quantity::new(4));
        draft.location = Some("Shelf B".into());
        let dock = Accessory::from_draft(Id::new(3), draft);

        let revised = dock
            .revise(AccessoryPatch {
                quantity: Some(Quantity::ZERO),
                accessory_type: Some(Some("docking station".into())),
                ..AccessoryPatch::default()
            })
            .unwrap();
        assert_eq!(revised.quantity, Quantity::ZERO);
        assert_eq!(revised.accessory_type.as_deref(), Some("docking station"));
        assert_eq!(revised.location.as_deref(), Some("Shelf B"));
        assert!(revised.is_below_minimum());
    }
}
