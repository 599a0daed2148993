//! Audit ledger rows.
//!
//! Activities are facts: written once by the operation they describe, in the
//! same transaction, and never updated or deleted afterwards.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Id};

use crate::consumable::ConsumableId;
use crate::hardware::{AccessoryId, ComponentId};
use crate::license::LicenseId;
use crate::unit::UnitId;
use crate::user::UserId;
use crate::vm::VmId;

pub type ActivityId = Id<Activity>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
    Checkout,
    Checkin,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Checkout => "checkout",
            Action::Checkin => "checkin",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "checkout" => Ok(Action::Checkout),
            "checkin" => Ok(Action::Checkin),
            other => Err(DomainError::validation(format!("unknown activity action {other:?}"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Unit,
    License,
    Consumable,
    Component,
    Accessory,
    Vm,
    User,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Unit => "unit",
            ItemType::License => "license",
            ItemType::Consumable => "consumable",
            ItemType::Component => "component",
            ItemType::Accessory => "accessory",
            ItemType::Vm => "vm",
            ItemType::User => "user",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "unit" => Ok(ItemType::Unit),
            "license" => Ok(ItemType::License),
            "consumable" => Ok(ItemType::Consumable),
            "component" => Ok(ItemType::Component),
            "accessory" => Ok(ItemType::Accessory),
            "vm" => Ok(ItemType::Vm),
            "user" => Ok(ItemType::User),
            other => Err(DomainError::validation(format!("unknown item type {other:?}"))),
        }
    }
}

/// The record an activity is about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_type: ItemType,
    pub item_id: i64,
}

impl From<UnitId> for ItemRef {
    fn from(id: UnitId) -> Self {
        Self {
            item_type: ItemType::Unit,
            item_id: id.get(),
        }
    }
}

impl From<LicenseId> for ItemRef {
    fn from(id: LicenseId) -> Self {
        Self {
            item_type: ItemType::License,
            item_id: id.get(),
        }
    }
}

impl From<ConsumableId> for ItemRef {
    fn from(id: ConsumableId) -> Self {
        Self {
            item_type: ItemType::Consumable,
            item_id: id.get(),
        }
    }
}

impl From<ComponentId> for ItemRef {
    fn from(id: ComponentId) -> Self {
        Self {
            item_type: ItemType::Component,
            item_id: id.get(),
        }
    }
}

impl From<AccessoryId> for ItemRef {
    fn from(id: AccessoryId) -> Self {
        Self {
            item_type: ItemType::Accessory,
            item_id: id.get(),
        }
    }
}

impl From<VmId> for ItemRef {
    fn from(id: VmId) -> Self {
        Self {
            item_type: ItemType::Vm,
            item_id: id.get(),
        }
    }
}

impl From<UserId> for ItemRef {
    fn from(id: UserId) -> Self {
        Self {
            item_type: ItemType::User,
            item_id: id.get(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Assigned in insertion order; breaks timestamp ties.
    pub id: ActivityId,
    pub action: Action,
    pub item: ItemRef,
    /// `None` for system-initiated actions.
    pub user_id: Option<UserId>,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Activity {
    /// Materialize an appended row. `fallback` stamps rows whose caller did
    /// not supply a timestamp.
    pub fn from_new(id: ActivityId, new: NewActivity, fallback: DateTime<Utc>) -> Self {
        Self {
            id,
            action: new.action,
            item: new.item,
            user_id: new.user_id,
            timestamp: new.timestamp.unwrap_or(fallback),
            notes: new.notes,
        }
    }

    /// Display order: timestamp, then insertion order.
    pub fn ledger_order(a: &Activity, b: &Activity) -> Ordering {
        a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub action: Action,
    pub item: ItemRef,
    pub user_id: Option<UserId>,
    pub timestamp: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewActivity {
    pub fn new(action: Action, item: impl Into<ItemRef>) -> Self {
        Self {
            action,
            item: item.into(),
            user_id: None,
            timestamp: None,
            notes: None,
        }
    }

    pub fn by(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn noting(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Read-side projection over the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActivityFilter {
    All,
    ByUser(UserId),
    ByItem(ItemRef),
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        match self {
            ActivityFilter::All => true,
            ActivityFilter::ByUser(user) => activity.user_id == Some(*user),
            ActivityFilter::ByItem(item) => activity.item == *item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn from_new_keeps_caller_timestamp_or_falls_back() {
        let unit: UnitId = Id::new(4);
        let stamped = NewActivity::new(Action::Create, unit).at(at(10));
        let stamped = Activity::from_new(Id::new(1), stamped, at(99));
        assert_eq!(stamped.timestamp, at(10));

        let unstamped =
            Activity::from_new(Id::new(2), NewActivity::new(Action::Create, unit), at(99));
        assert_eq!(unstamped.timestamp, at(99));
    }

    #[test]
    fn ledger_order_breaks_ties_by_id() {
        let unit: UnitId = Id::new(4);
        let first = Activity::from_new(Id::new(1), NewActivity::new(Action::Checkout, unit), at(5));
        let second = Activity::from_new(Id::new(2), NewActivity::new(Action::Checkin, unit), at(5));
        assert_eq!(Activity::ledger_order(&first, &second), Ordering::Less);
    }

    #[test]
    fn item_filter_distinguishes_kinds_sharing_an_id() {
        let unit: UnitId = Id::new(4);
        let license: LicenseId = Id::new(4);
        let row = Activity::from_new(Id::new(1), NewActivity::new(Action::Update, license), at(1));
        assert!(ActivityFilter::ByItem(license.into()).matches(&row));
        assert!(!ActivityFilter::ByItem(unit.into()).matches(&row));
    }

    #[test]
    fn user_filter_skips_system_rows() {
        let unit: UnitId = Id::new(4);
        let user: UserId = Id::new(7);
        let system = Activity::from_new(Id::new(1), NewActivity::new(Action::Create, unit), at(1));
        let checkout = NewActivity::new(Action::Checkout, unit).by(Some(user));
        let attributed = Activity::from_new(Id::new(2), checkout, at(2));
        assert!(!ActivityFilter::ByUser(user).matches(&system));
        assert!(ActivityFilter::ByUser(user).matches(&attributed));
    }

    #[test]
    fn action_text_matches_persisted_form() {
        let actions = [
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Checkout,
            Action::Checkin,
        ];
        for action in actions {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn item_type_text_matches_persisted_form() {
        let kinds = [
            ItemType::Unit,
            ItemType::License,
            ItemType::Consumable,
            ItemType::Component,
            ItemType::Accessory,
            ItemType::Vm,
            ItemType::User,
        ];
        for kind in kinds {
            assert_eq!(kind.as_str().parse::<ItemType>().unwrap(), kind);
        }
        assert_eq!(ItemRef::from(VmId::new(4)).item_type, ItemType::Vm);
    }
}
