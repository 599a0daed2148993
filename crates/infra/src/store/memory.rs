use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockroom_assets::{
    Accessory, Activity, ActivityFilter, Component, Consumable, ConsumableAssignment, ConsumableId,
    License, LicenseAssignment, LicenseId, NewActivity, Unit, User, UserId, VirtualMachine,
};
use stockroom_core::{Clock, Entity, Id, SystemClock};

use super::{ActivitySink, AssignmentQueries, InventoryStore, Repository, StoreError, StoreTx};

/// In-memory inventory store.
///
/// Intended for tests/dev. Not optimized for performance: every transaction
/// works on a full copy of the tables and holds the store lock until it
/// commits or is dropped, so transactions run strictly one at a time.
#[derive(Debug, Clone)]
pub struct InMemoryInventoryStore {
    state: Arc<Mutex<Tables>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` to stamp activities appended without a timestamp.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(Tables::default())),
            clock,
        }
    }
}

impl Default for InMemoryInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx {
            guard: Some(guard),
            working,
            clock: Arc::clone(&self.clock),
        })
    }
}

/// Transaction over [`InMemoryInventoryStore`].
///
/// Writes land in a private working copy that replaces the shared tables on
/// commit. Dropping the transaction discards the copy.
pub struct InMemoryTx {
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
    clock: Arc<dyn Clock>,
}

impl InMemoryTx {
    fn open(&self) -> Result<&Tables, StoreError> {
        match self.guard {
            Some(_) => Ok(&self.working),
            None => Err(StoreError::TransactionClosed),
        }
    }

    fn open_mut(&mut self) -> Result<&mut Tables, StoreError> {
        match self.guard {
            Some(_) => Ok(&mut self.working),
            None => Err(StoreError::TransactionClosed),
        }
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn commit(&mut self) -> Result<(), StoreError> {
        let mut guard = self.guard.take().ok_or(StoreError::TransactionClosed)?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────────────────

/// Rows of one entity kind plus its id sequence.
#[derive(Debug, Clone)]
pub struct Table<E> {
    rows: BTreeMap<Id<E>, E>,
    last_id: i64,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<E: Entity> Table<E> {
    fn next_id(&mut self) -> Id<E> {
        self.last_id += 1;
        Id::new(self.last_id)
    }

    fn contains(&self, id: Id<E>) -> bool {
        self.rows.contains_key(&id)
    }

    fn rows_where(&self, mut keep: impl FnMut(&E) -> bool) -> Vec<E> {
        self.rows.values().filter(|row| keep(row)).cloned().collect()
    }
}

/// The whole in-memory database.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    users: Table<User>,
    units: Table<Unit>,
    licenses: Table<License>,
    license_assignments: Table<LicenseAssignment>,
    consumables: Table<Consumable>,
    consumable_assignments: Table<ConsumableAssignment>,
    components: Table<Component>,
    accessories: Table<Accessory>,
    vms: Table<VirtualMachine>,
    activities: Vec<Activity>,
    last_activity_id: i64,
}

impl Tables {
    fn require_user(&self, id: UserId) -> Result<(), StoreError> {
        if self.users.contains(id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!("user {id} does not exist")))
        }
    }
}

/// Table lookup plus the constraints the Postgres schema enforces with
/// UNIQUE and FOREIGN KEY clauses.
pub trait MemoryTable: Entity {
    fn table(tables: &Tables) -> &Table<Self>;

    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    /// Checked before an insert or replace becomes visible.
    fn check_write(_tables: &Tables, _record: &Self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Checked before a row is removed.
    fn check_delete(_tables: &Tables, _id: Id<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

impl MemoryTable for User {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.users
    }

    fn check_write(tables: &Tables, record: &Self) -> Result<(), StoreError> {
        let taken = tables
            .users
            .rows
            .values()
            .any(|u| u.id != record.id && u.username == record.username);
        if taken {
            return Err(StoreError::Constraint(format!(
                "username {:?} already exists",
                record.username
            )));
        }
        Ok(())
    }

    fn check_delete(tables: &Tables, id: Id<Self>) -> Result<(), StoreError> {
        if tables.units.rows.values().any(|unit| unit.holder == Some(id)) {
            return Err(StoreError::Constraint(format!("user {id} still holds units")));
        }
        if tables.activities.iter().any(|a| a.user_id == Some(id)) {
            return Err(StoreError::Constraint(format!("user {id} is referenced by activities")));
        }
        Ok(())
    }
}

impl MemoryTable for Unit {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.units
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.units
    }

    fn check_write(tables: &Tables, record: &Self) -> Result<(), StoreError> {
        let taken = tables
            .units
            .rows
            .values()
            .any(|u| u.id != record.id && u.tag == record.tag);
        if taken {
            return Err(StoreError::Constraint(format!("unit tag {:?} already exists", record.tag)));
        }
        if let Some(holder) = record.holder {
            tables.require_user(holder)?;
        }
        Ok(())
    }
}

impl MemoryTable for License {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.licenses
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.licenses
    }

    fn check_delete(tables: &Tables, id: Id<Self>) -> Result<(), StoreError> {
        if tables.license_assignments.rows.values().any(|a| a.license_id == id) {
            return Err(StoreError::Constraint(format!("license {id} still has assignment rows")));
        }
        Ok(())
    }
}

impl MemoryTable for LicenseAssignment {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.license_assignments
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.license_assignments
    }

    fn check_write(tables: &Tables, record: &Self) -> Result<(), StoreError> {
        if !tables.licenses.contains(record.license_id) {
            return Err(StoreError::Constraint(format!(
                "license {} does not exist",
                record.license_id
            )));
        }
        Ok(())
    }
}

impl MemoryTable for Consumable {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.consumables
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.consumables
    }

    fn check_delete(tables: &Tables, id: Id<Self>) -> Result<(), StoreError> {
        if tables.consumable_assignments.rows.values().any(|a| a.consumable_id == id) {
            return Err(StoreError::Constraint(format!(
                "consumable {id} still has assignment rows"
            )));
        }
        Ok(())
    }
}

impl MemoryTable for ConsumableAssignment {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.consumable_assignments
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.consumable_assignments
    }

    fn check_write(tables: &Tables, record: &Self) -> Result<(), StoreError> {
        if !tables.consumables.contains(record.consumable_id) {
            return Err(StoreError::Constraint(format!(
                "consumable {} does not exist",
                record.consumable_id
            )));
        }
        Ok(())
    }
}

impl MemoryTable for Component {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.components
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.components
    }
}

impl MemoryTable for Accessory {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.accessories
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.accessories
    }
}

impl MemoryTable for VirtualMachine {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.vms
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.vms
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait impls
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl<E: MemoryTable> Repository<E> for InMemoryTx {
    async fn get(&mut self, id: Id<E>) -> Result<Option<E>, StoreError> {
        Ok(E::table(self.open()?).rows.get(&id).cloned())
    }

    async fn list(&mut self) -> Result<Vec<E>, StoreError> {
        Ok(E::table(self.open()?).rows.values().cloned().collect())
    }

    async fn insert(&mut self, draft: E::Draft) -> Result<E, StoreError> {
        let tables = self.open_mut()?;
        let record = E::from_draft(E::table_mut(tables).next_id(), draft);
        E::check_write(tables, &record)?;
        E::table_mut(tables).rows.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn replace(&mut self, record: E) -> Result<Option<E>, StoreError> {
        let tables = self.open_mut()?;
        if !E::table(tables).contains(record.id()) {
            return Ok(None);
        }
        E::check_write(tables, &record)?;
        E::table_mut(tables).rows.insert(record.id(), record.clone());
        Ok(Some(record))
    }

    async fn delete(&mut self, id: Id<E>) -> Result<bool, StoreError> {
        let tables = self.open_mut()?;
        if !E::table(tables).contains(id) {
            return Ok(false);
        }
        E::check_delete(tables, id)?;
        Ok(E::table_mut(tables).rows.remove(&id).is_some())
    }
}

#[async_trait]
impl AssignmentQueries for InMemoryTx {
    async fn license_assignments(
        &mut self,
        license: LicenseId,
    ) -> Result<Vec<LicenseAssignment>, StoreError> {
        let mut rows = self.open()?.license_assignments.rows_where(|a| a.license_id == license);
        rows.sort_by_key(|a| (a.assigned_date, a.id));
        Ok(rows)
    }

    async fn delete_license_assignments(&mut self, license: LicenseId) -> Result<u64, StoreError> {
        let table = &mut self.open_mut()?.license_assignments;
        let before = table.rows.len();
        table.rows.retain(|_, a| a.license_id != license);
        Ok((before - table.rows.len()) as u64)
    }

    async fn consumable_assignments(
        &mut self,
        consumable: ConsumableId,
    ) -> Result<Vec<ConsumableAssignment>, StoreError> {
        let mut rows = self
            .open()?
            .consumable_assignments
            .rows_where(|a| a.consumable_id == consumable);
        rows.sort_by_key(|a| (a.assigned_date, a.id));
        Ok(rows)
    }

    async fn delete_consumable_assignments(
        &mut self,
        consumable: ConsumableId,
    ) -> Result<u64, StoreError> {
        let table = &mut self.open_mut()?.consumable_assignments;
        let before = table.rows.len();
        table.rows.retain(|_, a| a.consumable_id != consumable);
        Ok((before - table.rows.len()) as u64)
    }
}

#[async_trait]
impl ActivitySink for InMemoryTx {
    async fn append(&mut self, activity: NewActivity) -> Result<Activity, StoreError> {
        let now = self.clock.now();
        let tables = self.open_mut()?;
        if let Some(user) = activity.user_id {
            tables.require_user(user)?;
        }
        tables.last_activity_id += 1;
        let row = Activity::from_new(Id::new(tables.last_activity_id), activity, now);
        tables.activities.push(row.clone());
        Ok(row)
    }

    async fn activities(&mut self, filter: ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        let mut rows: Vec<Activity> = self
            .open()?
            .activities
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(Activity::ledger_order);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stockroom_assets::{Action, NewLicense, NewLicenseAssignment, NewUnit, NewUser};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    async fn seeded_user(tx: &mut InMemoryTx) -> User {
        Repository::<User>::insert(tx, NewUser::new("jdoe", "Jane", "Doe", "jane@example.com"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = InMemoryInventoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            Repository::<Unit>::insert(&mut tx, NewUnit::new("A-1", "Laptop")).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(Repository::<Unit>::list(&mut tx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_the_next_transaction() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let unit = Repository::<Unit>::insert(&mut tx, NewUnit::new("A-1", "Laptop")).await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(tx.commit().await, Err(StoreError::TransactionClosed)));

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get(unit.id).await.unwrap(), Some(unit));
    }

    #[tokio::test]
    async fn unit_tags_are_unique() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        Repository::<Unit>::insert(&mut tx, NewUnit::new("A-1", "Laptop")).await.unwrap();
        let err = Repository::<Unit>::insert(&mut tx, NewUnit::new("A-1", "Other")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn holder_must_reference_a_user() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut unit = Repository::<Unit>::insert(&mut tx, NewUnit::new("A-1", "Laptop")).await.unwrap();
        unit.holder = Some(Id::new(99));
        assert!(matches!(tx.replace(unit).await, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn referenced_user_cannot_be_deleted() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = seeded_user(&mut tx).await;
        let unit = Repository::<Unit>::insert(&mut tx, NewUnit::new("A-1", "Laptop")).await.unwrap();
        tx.append(NewActivity::new(Action::Create, unit.id).by(Some(user.id)))
            .await
            .unwrap();
        assert!(matches!(
            Repository::<User>::delete(&mut tx, user.id).await,
            Err(StoreError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn license_rows_ordered_by_assignment_date() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let license = Repository::<License>::insert(&mut tx, NewLicense::new("Office", 3)).await.unwrap();
        for (who, d) in [("late", 9), ("early", 2)] {
            Repository::<LicenseAssignment>::insert(
                &mut tx,
                NewLicenseAssignment {
                    license_id: license.id,
                    assignee: who.into(),
                    serial: None,
                    notes: None,
                    assigned_date: day(d),
                },
            )
            .await
            .unwrap();
        }
        let rows = tx.license_assignments(license.id).await.unwrap();
        let names: Vec<_> = rows.iter().map(|a| a.assignee.as_str()).collect();
        assert_eq!(names, ["early", "late"]);

        assert!(Repository::<License>::delete(&mut tx, license.id).await.is_err());
        assert_eq!(tx.delete_license_assignments(license.id).await.unwrap(), 2);
        assert!(Repository::<License>::delete(&mut tx, license.id).await.unwrap());
    }

    #[tokio::test]
    async fn appended_activities_get_increasing_ids() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let unit: stockroom_assets::UnitId = Id::new(1);
        let first = tx.append(NewActivity::new(Action::Create, unit)).await.unwrap();
        let second = tx.append(NewActivity::new(Action::Update, unit)).await.unwrap();
        assert!(first.id < second.id);
        assert_eq!(tx.activities(ActivityFilter::All).await.unwrap(), vec![first, second]);
    }
}
