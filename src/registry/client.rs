//! Distributed actor registry client (§4.6): a local `known` mirror of the
//! cluster's placement view, an `own` registry of what this app hosts, a
//! long-poll pull loop and a periodic push loop. Grounded on the teacher
//! crate's `broker::registry` component, generalized from a static
//! capability table to a long-polled, continuously refreshed mirror.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::remote::Aborter;

/// Push cadence (§4.6).
pub const PUSH_INTERVAL: Duration = Duration::from_secs(30);
/// Pause between pull retries after a failed long-poll.
pub const PULL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RegistryClientError {
    #[error("registry service rpc failed: {0}")]
    Rpc(String),
    #[error("pull aborted")]
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub version: u64,
    pub bind_idx: Option<i64>,
    pub sticky: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub app: String,
    pub migration_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistryEntry {
    pub destinations: Vec<Destination>,
    pub placement: Option<Placement>,
}

/// One response to an `obtain` long-poll.
pub struct ObtainResponse {
    pub nonce: String,
    pub actor_info: HashMap<String, RegistryEntry>,
}

/// Client-side contract for the remote actor-registry service (§6).
#[async_trait]
pub trait RegistryServiceClient: Send + Sync {
    async fn obtain(&self, nonce: &str, actor_types: Option<Vec<String>>) -> Result<ObtainResponse, RegistryClientError>;
    async fn push(&self, application: &str, own: HashMap<String, RegistryEntry>) -> Result<(), RegistryClientError>;
}

/// Maintains `known` (the cluster view) and `own` (what this app hosts).
pub struct DistributedActorRegistry<C: RegistryServiceClient + 'static> {
    app_id: String,
    client: Arc<C>,
    known: DashMap<String, RegistryEntry>,
    own: DashMap<String, RegistryEntry>,
    requested: DashSet<String>,
    pull_aborter: Aborter,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<C: RegistryServiceClient + 'static> DistributedActorRegistry<C> {
    pub fn new(app_id: impl Into<String>, client: Arc<C>) -> Arc<Self> {
        Arc::new(Self {
            app_id: app_id.into(),
            client,
            known: DashMap::new(),
            own: DashMap::new(),
            requested: DashSet::new(),
            pull_aborter: Aborter::new(),
            tasks: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    /// Register (or replace) this app's own entry for `actor_type`.
    pub fn register_own(&self, actor_type: impl Into<String>, entry: RegistryEntry) {
        self.own.insert(actor_type.into(), entry);
    }

    /// `findPlacement` (§4.6): consult `known` first; on miss, mark the
    /// type as requested (so the next pull asks for it explicitly) and
    /// fall back to this app's own entry.
    pub fn find_placement(&self, actor_type: &str) -> Option<RegistryEntry> {
        if let Some(entry) = self.known.get(actor_type) {
            return Some(entry.clone());
        }
        self.requested.insert(actor_type.to_string());
        self.own.get(actor_type).map(|e| e.clone())
    }

    pub fn known_snapshot(&self) -> HashMap<String, RegistryEntry> {
        self.known.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    /// Spawns the pull and push background loops.
    pub fn start(self: &Arc<Self>) {
        let pull_handle = tokio::spawn(Arc::clone(self).pull_loop());
        let push_handle = tokio::spawn(Arc::clone(self).push_loop());
        // Lock acquisition here is synchronous-fast; `start` is only ever
        // called once during wiring, so blocking briefly is acceptable.
        if let Ok(mut tasks) = self.tasks.try_lock() {
            tasks.push(pull_handle);
            tasks.push(push_handle);
        }
    }

    /// Cancels the in-flight pull via its aborter and stops both loops.
    pub async fn stop(self: &Arc<Self>) {
        self.pull_aborter.abort();
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    async fn pull_loop(self: Arc<Self>) {
        let mut nonce = Uuid::new_v4().to_string();
        loop {
            if self.pull_aborter.is_aborted() {
                return;
            }
            let wanted: Option<Vec<String>> = if self.requested.is_empty() {
                None
            } else {
                Some(self.requested.iter().map(|e| e.clone()).collect())
            };

            let outcome = tokio::select! {
                result = self.client.obtain(&nonce, wanted) => result,
                _ = self.pull_aborter.aborted() => Err(RegistryClientError::Aborted),
            };

            match outcome {
                Ok(response) => {
                    for (actor_type, entry) in response.actor_info {
                        self.requested.remove(&actor_type);
                        self.known.insert(actor_type, entry);
                    }
                    nonce = response.nonce;
                }
                Err(RegistryClientError::Aborted) => return,
                Err(_) => {
                    tokio::time::sleep(PULL_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn push_loop(self: Arc<Self>) {
        loop {
            tokio::time::sleep(PUSH_INTERVAL).await;
            if self.pull_aborter.is_aborted() {
                return;
            }
            let own = self.own.iter().map(|e| (e.key().clone(), e.value().clone())).collect();
            let _ = self.client.push(&self.app_id, own).await;
        }
    }
}
