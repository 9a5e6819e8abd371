//! Monitoring event types and configuration, adapted from the teacher's
//! lifecycle-event family to this crate's virtual-actor domain.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::traits::{EventSeverity, MonitoringEvent};

#[derive(Debug, Clone, Serialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub max_history_size: usize,
    pub severity_filter: EventSeverity,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_history_size: 1000,
            severity_filter: EventSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoringSnapshot<E: MonitoringEvent> {
    pub timestamp: DateTime<Utc>,
    pub total_events: u64,
    pub trace_count: u64,
    pub debug_count: u64,
    pub info_count: u64,
    pub warning_count: u64,
    pub error_count: u64,
    pub critical_count: u64,
    pub recent_events: Vec<E>,
}

// ============================================================================
// Container events (§4.2: lifecycle, locking, eviction)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ContainerEvent {
    pub timestamp: DateTime<Utc>,
    pub actor_type: String,
    pub id_key: String,
    pub kind: ContainerEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ContainerEventKind {
    Obtained,
    Activated,
    Deactivated { reason: String },
    Evicted,
    Finalizing,
}

impl MonitoringEvent for ContainerEvent {
    const EVENT_TYPE: &'static str = "container";

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            ContainerEventKind::Obtained | ContainerEventKind::Activated => EventSeverity::Debug,
            ContainerEventKind::Deactivated { .. } | ContainerEventKind::Evicted => EventSeverity::Info,
            ContainerEventKind::Finalizing => EventSeverity::Warning,
        }
    }
}

// ============================================================================
// Portal events (§4.3: placement, retry, redirection)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PortalEvent {
    pub timestamp: DateTime<Utc>,
    pub actor_type: String,
    pub attempt: u32,
    pub destination: Option<String>,
    pub kind: PortalEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PortalEventKind {
    AttemptStarted,
    Redirected { to: String },
    StickyHit,
    StickyMiss,
    Exhausted,
}

impl MonitoringEvent for PortalEvent {
    const EVENT_TYPE: &'static str = "portal";

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            PortalEventKind::StickyHit | PortalEventKind::StickyMiss | PortalEventKind::AttemptStarted => EventSeverity::Trace,
            PortalEventKind::Redirected { .. } => EventSeverity::Info,
            PortalEventKind::Exhausted => EventSeverity::Error,
        }
    }
}

// ============================================================================
// Lock events (§4.4: lease acquire/refresh/break)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LockEvent {
    pub timestamp: DateTime<Utc>,
    pub id_key: String,
    pub kind: LockEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LockEventKind {
    Acquired { lease: Duration },
    RefreshOk,
    Broken { holder: Option<String> },
    Released,
}

impl MonitoringEvent for LockEvent {
    const EVENT_TYPE: &'static str = "lock";

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            LockEventKind::Acquired { .. } | LockEventKind::RefreshOk | LockEventKind::Released => EventSeverity::Debug,
            LockEventKind::Broken { .. } => EventSeverity::Warning,
        }
    }
}

// ============================================================================
// Registry events (§4.5: long-poll pull, periodic push)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RegistryEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: RegistryEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum RegistryEventKind {
    PullOk { updated: usize },
    PullError { reason: String },
    Pushed { count: usize },
}

impl MonitoringEvent for RegistryEvent {
    const EVENT_TYPE: &'static str = "registry";

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            RegistryEventKind::PullOk { .. } | RegistryEventKind::Pushed { .. } => EventSeverity::Trace,
            RegistryEventKind::PullError { .. } => EventSeverity::Warning,
        }
    }
}

// ============================================================================
// Persistence events (§4.7: load/store, optimistic-concurrency conflicts)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PersistenceEvent {
    pub timestamp: DateTime<Utc>,
    pub specifier: String,
    pub kind: PersistenceEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PersistenceEventKind {
    Loaded,
    Stored { version: String },
    BaselineConflict,
}

impl MonitoringEvent for PersistenceEvent {
    const EVENT_TYPE: &'static str = "persistence";

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            PersistenceEventKind::Loaded | PersistenceEventKind::Stored { .. } => EventSeverity::Trace,
            PersistenceEventKind::BaselineConflict => EventSeverity::Warning,
        }
    }
}
