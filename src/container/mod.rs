//! Instance container (§4.1, §4.2): per-`(type, id)` lifecycle, the
//! shared/exclusive per-instance lock, and LRU eviction with background,
//! non-blocking deactivation.

pub mod container;
pub mod wrapper;

pub use container::{BehaviorFactory, InstanceContainer};
pub use wrapper::{ActorBehavior, InstanceWrapper, LockFactory, LockGuard, LockingMode};
