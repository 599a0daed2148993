//! Persistence boundary for inventory records and the audit ledger.
//!
//! Everything a lifecycle operation reads or writes goes through one
//! [`StoreTx`]: the entity mutations and the activity append either all
//! become visible at [`StoreTx::commit`] or none do. Dropping a transaction
//! without committing rolls it back.
//!
//! ## Isolation
//!
//! Reads through [`Repository::get`] inside a transaction lock the row until
//! the transaction ends, so a precondition check and the write that depends
//! on it cannot interleave with another transaction touching the same
//! record. The in-memory backend gets the same guarantee by serializing whole
//! transactions.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryInventoryStore, InMemoryTx};
pub use postgres::{PgInventoryStore, PgTx};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stockroom_assets::{
    Accessory, Activity, ActivityFilter, Component, Consumable, ConsumableAssignment, ConsumableId,
    License, LicenseAssignment, LicenseId, NewActivity, Unit, User, VirtualMachine,
};
use stockroom_core::{Entity, Id};

/// Store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors: a
/// constraint the store refused, or the store itself failing.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness, foreign-key or check constraint refused the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Connection, decoding or any other backend failure.
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// The transaction was already committed.
    #[error("transaction already finished")]
    TransactionClosed,
}

/// Per-entity CRUD inside a transaction.
#[async_trait]
pub trait Repository<E: Entity>: Send {
    /// Read (and lock, for the rest of the transaction) one record.
    async fn get(&mut self, id: Id<E>) -> Result<Option<E>, StoreError>;

    /// All records, ordered by id.
    async fn list(&mut self) -> Result<Vec<E>, StoreError>;

    async fn insert(&mut self, draft: E::Draft) -> Result<E, StoreError>;

    /// Overwrite every column of an existing record. `None` if it is gone.
    async fn replace(&mut self, record: E) -> Result<Option<E>, StoreError>;

    async fn delete(&mut self, id: Id<E>) -> Result<bool, StoreError>;

    /// Partial update: locked read, patch, full write.
    async fn update(&mut self, id: Id<E>, patch: E::Patch) -> Result<Option<E>, StoreError> {
        let Some(mut record) = self.get(id).await? else {
            return Ok(None);
        };
        record.apply_patch(patch);
        self.replace(record).await
    }
}

/// Child-row queries keyed by parent.
#[async_trait]
pub trait AssignmentQueries: Send {
    /// Seats of a license, oldest grant first.
    async fn license_assignments(
        &mut self,
        license: LicenseId,
    ) -> Result<Vec<LicenseAssignment>, StoreError>;

    async fn delete_license_assignments(&mut self, license: LicenseId) -> Result<u64, StoreError>;

    /// Stock grants of a consumable, oldest grant first.
    async fn consumable_assignments(
        &mut self,
        consumable: ConsumableId,
    ) -> Result<Vec<ConsumableAssignment>, StoreError>;

    async fn delete_consumable_assignments(
        &mut self,
        consumable: ConsumableId,
    ) -> Result<u64, StoreError>;
}

/// Append-only audit ledger.
///
/// Rows are never updated or deleted.
#[async_trait]
pub trait ActivitySink: Send {
    /// Insert one row. The store assigns the id and, when the caller left it
    /// empty, the timestamp.
    async fn append(&mut self, activity: NewActivity) -> Result<Activity, StoreError>;

    /// Matching rows ordered by timestamp, then id.
    async fn activities(&mut self, filter: ActivityFilter) -> Result<Vec<Activity>, StoreError>;
}

/// One atomic unit of work against the store.
#[async_trait]
pub trait StoreTx:
    Repository<User>
    + Repository<Unit>
    + Repository<License>
    + Repository<LicenseAssignment>
    + Repository<Consumable>
    + Repository<ConsumableAssignment>
    + Repository<Component>
    + Repository<Accessory>
    + Repository<VirtualMachine>
    + AssignmentQueries
    + ActivitySink
    + Send
{
    /// Make every write of this transaction visible at once.
    async fn commit(&mut self) -> Result<(), StoreError>;
}

/// Transaction factory. Implementations must be cheap to share across
/// concurrent callers.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    type Tx: StoreTx + 'static;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }
}
