//! Lifecycle Manager: the one place inventory records change.
//!
//! Every operation follows the same shape:
//!
//! ```text
//! begin transaction
//!   ↓
//! locked read of the record(s) involved
//!   ↓
//! pure domain decision (stockroom-assets) → patch / draft, or a typed rejection
//!   ↓
//! write the patch, append exactly one Activity
//!   ↓
//! commit
//! ```
//!
//! A rejection at any step drops the transaction, so neither the entity write
//! nor the audit row becomes visible. The manager holds no state between
//! calls besides its store handle, clock and policy.

mod consumables;
mod hardware;
mod licenses;
mod units;
mod users;
mod vms;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use stockroom_assets::{Action, ItemRef, NewActivity, SeatPolicy};
use stockroom_core::{Clock, DomainError, Entity, Id};

use crate::store::{InventoryStore, Repository, StoreError};

/// Operation failure, grouped by how a caller should react.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// The record exists but its current state does not allow the operation.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Stock or seats would be over-committed. Nothing was written.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// The store refused or failed the write. The whole operation was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for LifecycleError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                LifecycleError::Validation(msg)
            }
            DomainError::NotFound { kind, id } => LifecycleError::NotFound { kind, id },
            DomainError::InvalidTransition(msg) => LifecycleError::InvalidTransition(msg),
            DomainError::CapacityExceeded(msg) => LifecycleError::CapacityExceeded(msg),
        }
    }
}

impl LifecycleError {
    /// Recoverable rejections a caller presents to the user, as opposed to
    /// store failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, LifecycleError::Store(_))
    }

    fn trace(&self, operation: &'static str) {
        if self.is_rejection() {
            debug!(operation, error = %self, "operation rejected");
        } else {
            error!(operation, error = %self, "operation aborted by store failure");
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Tunables handed to the manager at construction.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub seat_policy: SeatPolicy,
}

/// Applies lifecycle transitions against an [`InventoryStore`].
#[derive(Debug, Clone)]
pub struct LifecycleManager<S> {
    store: S,
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
}

impl<S: InventoryStore> LifecycleManager<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, policy: LifecyclePolicy) -> Self {
        Self { store, clock, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> LifecyclePolicy {
        self.policy
    }

    /// Ledger row stamped with the manager's clock.
    fn activity(&self, action: Action, item: impl Into<ItemRef>) -> NewActivity {
        NewActivity::new(action, item).at(self.clock.now())
    }
}

/// Log a failed operation at the level its kind deserves and pass it on.
fn traced<T>(operation: &'static str, result: LifecycleResult<T>) -> LifecycleResult<T> {
    result.inspect_err(|err| err.trace(operation))
}

/// Locked read that treats a missing row as [`LifecycleError::NotFound`].
async fn fetch<E, T>(tx: &mut T, id: Id<E>) -> LifecycleResult<E>
where
    E: Entity,
    T: Repository<E> + ?Sized,
{
    tx.get(id).await?.ok_or(LifecycleError::NotFound {
        kind: E::KIND,
        id: id.get(),
    })
}

/// Full write of a record read earlier in the same transaction.
async fn persist<E, T>(tx: &mut T, record: E) -> LifecycleResult<E>
where
    E: Entity,
    T: Repository<E> + ?Sized,
{
    let id = record.id();
    tx.replace(record).await?.ok_or(LifecycleError::NotFound {
        kind: E::KIND,
        id: id.get(),
    })
}

/// Delete a record read earlier in the same transaction.
async fn remove<E, T>(tx: &mut T, id: Id<E>) -> LifecycleResult<()>
where
    E: Entity,
    T: Repository<E> + ?Sized,
{
    if tx.delete(id).await? {
        Ok(())
    } else {
        Err(LifecycleError::NotFound {
            kind: E::KIND,
            id: id.get(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            LifecycleError::from(DomainError::capacity("full")),
            LifecycleError::CapacityExceeded(_)
        ));
        assert!(matches!(
            LifecycleError::from(DomainError::invalid_id("x")),
            LifecycleError::Validation(_)
        ));
        match LifecycleError::from(DomainError::not_found("unit", 4)) {
            LifecycleError::NotFound { kind, id } => assert_eq!((kind, id), ("unit", 4)),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn store_failures_are_not_rejections() {
        assert!(LifecycleError::InvalidTransition("busy".into()).is_rejection());
        assert!(!LifecycleError::Store(StoreError::Backend("down".into())).is_rejection());
    }
}
