//! Core monitoring traits, generic over the event type (§3.1: no `dyn` in
//! the hot path, mirroring the teacher's `MessageBroker<M>` style).

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::MonitoringError;
use super::types::MonitoringSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EventSeverity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

pub trait MonitoringEvent: Send + Sync + Clone + Debug + Serialize + 'static {
    const EVENT_TYPE: &'static str;

    fn timestamp(&self) -> DateTime<Utc>;
    fn severity(&self) -> EventSeverity;

    /// Whether this event clears a monitor's configured severity floor.
    /// `InMemoryMonitor::record` uses this instead of comparing
    /// `severity()` inline, so every `Monitor<E>` impl filters the same way.
    fn passes_filter(&self, floor: EventSeverity) -> bool {
        self.severity() >= floor
    }
}

#[async_trait]
pub trait Monitor<E: MonitoringEvent>: Send + Sync + Clone {
    async fn record(&self, event: E) -> Result<(), MonitoringError>;
    async fn snapshot(&self) -> Result<MonitoringSnapshot<E>, MonitoringError>;
    async fn reset(&self) -> Result<(), MonitoringError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{RegistryEvent, RegistryEventKind};

    fn pull_error() -> RegistryEvent {
        RegistryEvent { timestamp: Utc::now(), kind: RegistryEventKind::PullError { reason: "timeout".into() } }
    }

    #[test]
    fn event_severity_ordering() {
        assert!(EventSeverity::Trace < EventSeverity::Debug);
        assert!(EventSeverity::Warning < EventSeverity::Error);
        assert!(EventSeverity::Error < EventSeverity::Critical);
    }

    #[test]
    fn passes_filter_is_inclusive_of_the_floor() {
        let event = pull_error();
        assert_eq!(event.severity(), EventSeverity::Warning);
        assert!(event.passes_filter(EventSeverity::Warning));
        assert!(event.passes_filter(EventSeverity::Info));
        assert!(!event.passes_filter(EventSeverity::Error));
    }
}
