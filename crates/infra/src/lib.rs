//! Infrastructure layer: stores, lifecycle operations, audit ledger, stats
//! and configuration.

pub mod config;
pub mod ledger;
pub mod lifecycle;
pub mod stats;
pub mod store;


pub use config::{ConfigError, StoreBackend, StoreConfig};
pub use ledger::AuditLedger;
pub use lifecycle::{LifecycleError, LifecycleManager, LifecyclePolicy, LifecycleResult};
pub use stats::StatsAggregator;
pub use store::{
    ActivitySink, AssignmentQueries, InMemoryInventoryStore, InventoryStore, PgInventoryStore,
    Repository, StoreError, StoreTx,
};
