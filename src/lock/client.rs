//! Distributed actor lock client (§4.5): lease acquire, periodic refresh,
//! `onBroken` callback. Grounded on the teacher crate's health-monitor
//! heartbeat task — a periodic re-check against a remote authority that
//! fires a caller callback on failure — adapted from a health ping to a
//! lease-refresh RPC.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::container::{LockFactory, LockGuard};
use crate::error::{param, FrameworkError, FrameworkErrorCode};

/// Lease TTL requested from the lock service (§3 "Acquired lock" lifecycle).
pub const LEASE_TTL: Duration = Duration::from_secs(60);
/// Refresh cadence, must stay well under [`LEASE_TTL`].
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum LockClientError {
    #[error("lock service rpc failed: {0}")]
    Rpc(String),
}

/// Response to an `acquire` RPC against the lock service.
pub struct AcquireResponse {
    /// Zero means the lease was denied; `holders` then names current owners.
    pub duration: Duration,
    pub holders: Vec<String>,
}

/// Client-side contract for the remote actor-lock service (§6).
#[async_trait]
pub trait LockServiceClient: Send + Sync {
    async fn acquire(&self, id_key: &str, requester: &str, ttl: Duration) -> Result<AcquireResponse, LockClientError>;
    async fn release(&self, id_key: &str, requester: &str) -> Result<(), LockClientError>;
}

/// [`crate::container::LockFactory`] implementation backed by a remote
/// [`LockServiceClient`].
pub struct DistributedActorLock<C: LockServiceClient + 'static> {
    requester: String,
    client: Arc<C>,
}

impl<C: LockServiceClient + 'static> DistributedActorLock<C> {
    pub fn new(requester: impl Into<String>, client: Arc<C>) -> Self {
        Self {
            requester: requester.into(),
            client,
        }
    }
}

#[async_trait]
impl<C: LockServiceClient + 'static> LockFactory for DistributedActorLock<C> {
    async fn acquire(
        &self,
        id_key: &str,
        on_broken: Arc<dyn Fn() + Send + Sync>,
    ) -> Result<Box<dyn LockGuard>, FrameworkError> {
        let response = self
            .client
            .acquire(id_key, &self.requester, LEASE_TTL)
            .await
            .map_err(|e| FrameworkError::new(FrameworkErrorCode::ActorLockFailed, e.to_string()))?;

        if response.duration.is_zero() {
            let holder = response.holders.first().cloned().unwrap_or_default();
            return Err(
                FrameworkError::new(FrameworkErrorCode::ActorLockFailed, "lease denied")
                    .with_parameter(param::REDIRECT_DESTINATION, Value::String(holder)),
            );
        }

        let released = Arc::new(AtomicBool::new(false));
        let refresh_task = spawn_refresher(
            id_key.to_string(),
            self.requester.clone(),
            self.client.clone(),
            on_broken,
            released.clone(),
        );

        Ok(Box::new(HeldLock {
            id_key: id_key.to_string(),
            requester: self.requester.clone(),
            client: self.client.clone(),
            refresh_task: Mutex::new(Some(refresh_task)),
            released,
        }))
    }
}

fn spawn_refresher<C: LockServiceClient + 'static>(
    id_key: String,
    requester: String,
    client: Arc<C>,
    on_broken: Arc<dyn Fn() + Send + Sync>,
    released: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(REFRESH_INTERVAL).await;
            if released.load(Ordering::SeqCst) {
                return;
            }
            match client.acquire(&id_key, &requester, LEASE_TTL).await {
                Ok(response) if !response.duration.is_zero() => continue,
                _ => {
                    on_broken();
                    return;
                }
            }
        }
    })
}

struct HeldLock<C: LockServiceClient + 'static> {
    id_key: String,
    requester: String,
    client: Arc<C>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl<C: LockServiceClient + 'static> LockGuard for HeldLock<C> {
    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        if let Some(handle) = self.refresh_task.lock().await.take() {
            handle.abort();
        }
        let _ = self.client.release(&self.id_key, &self.requester).await;
    }
}
