//! Observability (§3.1): a `Monitor<E>` trait generic over the event type,
//! a `NoopMonitor` for production use when events aren't consumed, and an
//! `InMemoryMonitor` for tests and local operation.

pub mod error;
pub mod in_memory;
pub mod noop;
pub mod traits;
pub mod types;

pub use error::MonitoringError;
pub use in_memory::InMemoryMonitor;
pub use noop::NoopMonitor;
pub use traits::{EventSeverity, Monitor, MonitoringEvent};
pub use types::{
    ContainerEvent, ContainerEventKind, LockEvent, LockEventKind, MonitoringConfig, MonitoringSnapshot, PersistenceEvent, PersistenceEventKind, PortalEvent,
    PortalEventKind, RegistryEvent, RegistryEventKind,
};
