//! In-memory monitor: atomic counters plus a bounded ring buffer of recent
//! events, cheap to `Clone` via `Arc<Inner>` like the teacher's own clients.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use super::error::MonitoringError;
use super::traits::{EventSeverity, Monitor, MonitoringEvent};
use super::types::{MonitoringConfig, MonitoringSnapshot};

#[derive(Debug)]
pub struct InMemoryMonitor<E: MonitoringEvent> {
    inner: Arc<Inner<E>>,
}

#[derive(Debug)]
struct Inner<E: MonitoringEvent> {
    config: MonitoringConfig,
    total_events: AtomicU64,
    trace_count: AtomicU64,
    debug_count: AtomicU64,
    info_count: AtomicU64,
    warning_count: AtomicU64,
    error_count: AtomicU64,
    critical_count: AtomicU64,
    history: RwLock<VecDeque<E>>,
}

impl<E: MonitoringEvent> InMemoryMonitor<E> {
    pub fn new(config: MonitoringConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                total_events: AtomicU64::new(0),
                trace_count: AtomicU64::new(0),
                debug_count: AtomicU64::new(0),
                info_count: AtomicU64::new(0),
                warning_count: AtomicU64::new(0),
                error_count: AtomicU64::new(0),
                critical_count: AtomicU64::new(0),
                history: RwLock::new(VecDeque::new()),
            }),
        }
    }

    fn bump(&self, severity: EventSeverity) {
        let counter = match severity {
            EventSeverity::Trace => &self.inner.trace_count,
            EventSeverity::Debug => &self.inner.debug_count,
            EventSeverity::Info => &self.inner.info_count,
            EventSeverity::Warning => &self.inner.warning_count,
            EventSeverity::Error => &self.inner.error_count,
            EventSeverity::Critical => &self.inner.critical_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl<E: MonitoringEvent> Clone for InMemoryMonitor<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

#[async_trait]
impl<E: MonitoringEvent> Monitor<E> for InMemoryMonitor<E> {
    async fn record(&self, event: E) -> Result<(), MonitoringError> {
        if !self.inner.config.enabled {
            return Ok(());
        }
        if !event.passes_filter(self.inner.config.severity_filter) {
            return Ok(());
        }
        let severity = event.severity();

        self.inner.total_events.fetch_add(1, Ordering::Relaxed);
        self.bump(severity);

        let mut history = self.inner.history.write().map_err(|e| MonitoringError::record(e.to_string()))?;
        if history.len() >= self.inner.config.max_history_size {
            history.pop_front();
        }
        history.push_back(event);
        Ok(())
    }

    async fn snapshot(&self) -> Result<MonitoringSnapshot<E>, MonitoringError> {
        let history = self.inner.history.read().map_err(|e| MonitoringError::snapshot(e.to_string()))?;
        Ok(MonitoringSnapshot {
            timestamp: Utc::now(),
            total_events: self.inner.total_events.load(Ordering::Relaxed),
            trace_count: self.inner.trace_count.load(Ordering::Relaxed),
            debug_count: self.inner.debug_count.load(Ordering::Relaxed),
            info_count: self.inner.info_count.load(Ordering::Relaxed),
            warning_count: self.inner.warning_count.load(Ordering::Relaxed),
            error_count: self.inner.error_count.load(Ordering::Relaxed),
            critical_count: self.inner.critical_count.load(Ordering::Relaxed),
            recent_events: history.iter().cloned().collect(),
        })
    }

    async fn reset(&self) -> Result<(), MonitoringError> {
        self.inner.total_events.store(0, Ordering::Relaxed);
        self.inner.trace_count.store(0, Ordering::Relaxed);
        self.inner.debug_count.store(0, Ordering::Relaxed);
        self.inner.info_count.store(0, Ordering::Relaxed);
        self.inner.warning_count.store(0, Ordering::Relaxed);
        self.inner.error_count.store(0, Ordering::Relaxed);
        self.inner.critical_count.store(0, Ordering::Relaxed);
        self.inner.history.write().map_err(|e| MonitoringError::reset(e.to_string()))?.clear();
        Ok(())
    }
}
