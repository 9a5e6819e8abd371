//! Per-actor persistence (§4.7): scalar and table envelopes over an
//! opaque [`service::PersistenceService`] RPC seam, version monotonicity
//! for scalars, optimistic-concurrency baselines for tables, and a
//! schema-migration gate shared by both.

pub mod migration;
pub mod scalar;
pub mod service;
pub mod table;

pub use migration::{MigrationController, MigrationEnvelope};
pub use scalar::Persistable;
pub use service::{PersistenceError, PersistenceService, StoredRow, StoredValue};
pub use table::TablePersistable;
