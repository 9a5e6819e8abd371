//! # virtacor — virtual-actor runtime core
//!
//! Location-transparent, singleton, stateful actors addressed by
//! `(ActorType, ActorId)` rather than a process or connection. Any app in
//! the cluster can call any actor; the runtime places, locks, retries and
//! persists it transparently.
//!
//! # Module Organization
//!
//! ## Identity and wire format
//! - [`identity`] - normalized actor type names and ordered id-part keys
//! - [`wire`] - the binary call/return envelope and NATS-like batch framing
//! - [`error`] - `ActionError`: the application/framework error sum type
//!
//! ## Call path
//! - [`transport`] - `Transport` seam, in-proc loopback, batched pub/sub bus
//! - [`remote`] - call/return correlation, timeouts, abort propagation
//! - [`portal`] - placement resolution, retry/backoff, redirection, sticky cache
//!
//! ## Instance lifecycle
//! - [`container`] - per-`(type, id)` lifecycle state machine, RW lock, LRU eviction
//! - [`lock`] - distributed lease acquire/refresh/break
//! - [`registry`] - distributed placement mirror: long-poll pull, periodic push
//!
//! ## State
//! - [`persistence`] - scalar and table persisted values, version monotonicity,
//!   optimistic-concurrency baselines, schema-migration gating
//!
//! ## Ambient stack
//! - [`runtime`] - `Config` and the `Runtime` handle that wires everything above
//! - [`monitoring`] - event observation, generic over the event type

pub mod container;
pub mod error;
pub mod identity;
pub mod lock;
pub mod monitoring;
pub mod persistence;
pub mod portal;
pub mod registry;
pub mod remote;
pub mod runtime;
pub mod transport;
pub mod wire;

pub use container::{ActorBehavior, BehaviorFactory, InstanceContainer, InstanceWrapper, LockFactory, LockGuard, LockingMode};
pub use error::{ActionError, ApplicationError, FrameworkError, FrameworkErrorCode};
pub use identity::{ActorId, ActorType, IdKeyError};
pub use lock::{AcquireResponse, DistributedActorLock, LockClientError, LockServiceClient};
pub use monitoring::{
    ContainerEvent, ContainerEventKind, EventSeverity, InMemoryMonitor, LockEvent, LockEventKind, Monitor, MonitoringConfig, MonitoringError, MonitoringEvent,
    MonitoringSnapshot, NoopMonitor, PersistenceEvent, PersistenceEventKind, PortalEvent, PortalEventKind, RegistryEvent, RegistryEventKind,
};
pub use persistence::{MigrationController, MigrationEnvelope, Persistable, PersistenceError, PersistenceService, StoredRow, StoredValue, TablePersistable};
pub use portal::RemotePortal;
pub use registry::{Destination, DistributedActorRegistry, ObtainResponse, Placement, RegistryClientError, RegistryEntry, RegistryServiceClient};
pub use remote::{Aborter, InvokeOutcome, InvokeRequest, LocalDispatcher, TransportRemote};
pub use runtime::{Config, Runtime, RuntimeError};
pub use transport::{BusTransport, LoopbackNetwork, LoopbackTransport, PubSubClient, PubSubError, Transport, TransportSendError};
pub use wire::{CallKind, Variant, WireEnvelope, WireError};
