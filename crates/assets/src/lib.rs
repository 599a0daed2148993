//! Inventory domain module.
//!
//! This crate contains the lifecycle rules for units, licenses, consumable
//! stock and the plainer hardware and VM inventory, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Each transition
//! inspects a record and returns the patch to persist; the infrastructure
//! layer applies it together with the matching audit entry.

pub mod activity;
pub mod assignment;
pub mod consumable;
pub mod hardware;
pub mod license;
pub mod purchase;
pub mod stats;
pub mod unit;
pub mod user;
pub mod vm;

pub use activity::{Action, Activity, ActivityFilter, ActivityId, ItemRef, ItemType, NewActivity};
pub use assignment::AssignmentStatus;
pub use consumable::{
    Consumable, ConsumableAssignment, ConsumableAssignmentId, ConsumableAssignmentPatch,
    ConsumableId, ConsumablePatch, NewConsumable, NewConsumableAssignment, StockRequest,
};
pub use hardware::{
    Accessory, AccessoryId, AccessoryPatch, Component, ComponentId, ComponentPatch, NewAccessory,
    NewComponent,
};
pub use license::{
    License, LicenseAssignment, LicenseAssignmentId, LicenseAssignmentPatch, LicenseId,
    LicensePatch, NewLicense, NewLicenseAssignment, SeatDecision, SeatPolicy, SeatRequest,
};
pub use purchase::PurchaseInfo;
pub use stats::{SeatUsage, UnitStats};
pub use unit::{NewUnit, Unit, UnitId, UnitPatch, UnitStatus};
pub use user::{Access, NewUser, Operation, PermissionSet, Resource, User, UserId, UserPatch};
pub use vm::{NewVm, PowerState, VirtualMachine, VmId, VmPatch};
