//! Runtime configuration (§3.3): mirrors the teacher's `SystemConfig` +
//! builder, with the invariant `timeout_rpc < lock_ttl / 2` enforced by
//! `validate()`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_APP_ID: &str = "app";
pub const DEFAULT_CONTAINER_CAPACITY: usize = 10_000;
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_BACKOFF_BUDGET: Duration = Duration::from_secs(5);
pub const DEFAULT_STICKY_CACHE_CAPACITY: usize = 4096;

/// Runtime-wide configuration. Every field has a sensible default; most
/// deployments only set `app_id` and `runtime_apps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// This process's own application id, used as the `destination` other
    /// apps address calls to.
    pub app_id: String,
    /// Seed application ids for the lock and registry clusters.
    pub runtime_apps: Vec<String>,
    /// LRU capacity of the instance container, per actor type.
    pub container_capacity: usize,
    /// Per-call RPC timeout.
    pub rpc_timeout: Duration,
    /// Lease TTL requested from the distributed lock service.
    pub lock_ttl: Duration,
    /// Total wall-clock retry budget for one portal `invoke`.
    pub backoff_budget: Duration,
    /// Capacity of the portal's sticky-placement cache.
    pub sticky_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            runtime_apps: Vec::new(),
            container_capacity: DEFAULT_CONTAINER_CAPACITY,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            lock_ttl: DEFAULT_LOCK_TTL,
            backoff_budget: DEFAULT_BACKOFF_BUDGET,
            sticky_cache_capacity: DEFAULT_STICKY_CACHE_CAPACITY,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `timeoutRPC < lockTTL / 2` so a stalled call can never outlive the
    /// lease that's protecting it (§9 decided open question).
    pub fn validate(&self) -> Result<(), String> {
        if self.app_id.is_empty() {
            return Err("app_id must not be empty".to_string());
        }
        if self.container_capacity == 0 {
            return Err("container_capacity must be > 0".to_string());
        }
        if self.rpc_timeout >= self.lock_ttl / 2 {
            return Err(format!(
                "rpc_timeout ({:?}) must be less than lock_ttl / 2 ({:?})",
                self.rpc_timeout,
                self.lock_ttl / 2
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = app_id.into();
        self
    }

    pub fn runtime_apps(mut self, apps: Vec<String>) -> Self {
        self.config.runtime_apps = apps;
        self
    }

    pub fn container_capacity(mut self, capacity: usize) -> Self {
        self.config.container_capacity = capacity;
        self
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.config.rpc_timeout = timeout;
        self
    }

    pub fn lock_ttl(mut self, ttl: Duration) -> Self {
        self.config.lock_ttl = ttl;
        self
    }

    pub fn backoff_budget(mut self, budget: Duration) -> Self {
        self.config.backoff_budget = budget;
        self
    }

    pub fn sticky_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.sticky_cache_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Config, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
