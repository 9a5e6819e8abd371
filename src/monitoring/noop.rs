//! Discards everything. Wired in when a deployment has no monitor
//! configured, so the container/portal/lock/registry/persistence call
//! sites never need an `Option<M>` branch.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;

use super::error::MonitoringError;
use super::traits::{Monitor, MonitoringEvent};
use super::types::MonitoringSnapshot;

#[derive(Debug, Default)]
pub struct NoopMonitor<E: MonitoringEvent> {
    event_kind: PhantomData<E>,
}

impl<E: MonitoringEvent> Clone for NoopMonitor<E> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: MonitoringEvent> Copy for NoopMonitor<E> {}

impl<E: MonitoringEvent> NoopMonitor<E> {
    #[inline(always)]
    pub fn new() -> Self {
        Self { event_kind: PhantomData }
    }
}

fn empty_snapshot<E: MonitoringEvent>() -> MonitoringSnapshot<E> {
    MonitoringSnapshot {
        timestamp: Utc::now(),
        total_events: 0,
        trace_count: 0,
        debug_count: 0,
        info_count: 0,
        warning_count: 0,
        error_count: 0,
        critical_count: 0,
        recent_events: Vec::new(),
    }
}

#[async_trait]
impl<E: MonitoringEvent> Monitor<E> for NoopMonitor<E> {
    #[inline(always)]
    async fn record(&self, _event: E) -> Result<(), MonitoringError> {
        Ok(())
    }

    #[inline(always)]
    async fn snapshot(&self) -> Result<MonitoringSnapshot<E>, MonitoringError> {
        Ok(empty_snapshot())
    }

    #[inline(always)]
    async fn reset(&self) -> Result<(), MonitoringError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{LockEvent, LockEventKind};

    fn lease_broken() -> LockEvent {
        LockEvent { timestamp: Utc::now(), id_key: "echoactor/x".into(), kind: LockEventKind::Broken { holder: Some("app1".into()) } }
    }

    #[tokio::test]
    async fn flood_of_records_leaves_snapshot_empty() {
        let monitor = NoopMonitor::new();
        for _ in 0..50 {
            monitor.record(lease_broken()).await.unwrap();
        }
        let snapshot = monitor.snapshot().await.unwrap();
        assert_eq!(snapshot.total_events, 0);
        assert!(snapshot.recent_events.is_empty());
    }

    #[tokio::test]
    async fn reset_is_a_no_op_too() {
        let monitor = NoopMonitor::<LockEvent>::new();
        monitor.reset().await.unwrap();
        assert_eq!(monitor.snapshot().await.unwrap().total_events, 0);
    }

    #[test]
    fn clone_is_independent_and_still_empty() {
        let a = NoopMonitor::<LockEvent>::new();
        let b = a;
        assert_eq!(a.event_kind, b.event_kind);
    }
}
