//! `RemotePortal` (§4.3): placement resolution, retry with backoff,
//! redirection, sticky caching and abort propagation over a
//! [`TransportRemote`]. Grounded on the teacher crate's `supervisor`
//! retry/restart loop, generalized from a fixed restart policy to a
//! destination-iterating call retry with redirect and migration filtering.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;

use super::backoff::ExponentialBackoff;
use super::cache::StickyCache;
use crate::error::{ActionError, FrameworkError, FrameworkErrorCode};
use crate::identity::ActorId;
use crate::registry::{DistributedActorRegistry, RegistryServiceClient};
use crate::remote::{Aborter, InvokeOutcome, InvokeRequest, TransportRemote};
use crate::transport::Transport;
use crate::wire::Variant;

/// Destination iteration is capped at 10 rounds (§4.3).
pub const MAX_ROUNDS: u32 = 10;

pub struct RemotePortal<C: RegistryServiceClient + 'static, T: Transport + 'static> {
    registry: Arc<DistributedActorRegistry<C>>,
    remote: Arc<TransportRemote<T>>,
    sticky_cache: StickyCache,
    backoff_budget: Duration,
}

impl<C: RegistryServiceClient + 'static, T: Transport + 'static> RemotePortal<C, T> {
    pub fn new(registry: Arc<DistributedActorRegistry<C>>, remote: Arc<TransportRemote<T>>, sticky_capacity: usize) -> Self {
        Self {
            registry,
            remote,
            sticky_cache: StickyCache::new(sticky_capacity),
            backoff_budget: super::backoff::DEFAULT_BUDGET,
        }
    }

    pub fn with_backoff_budget(mut self, budget: Duration) -> Self {
        self.backoff_budget = budget;
        self
    }

    /// One logical RPC with retry (§4.3).
    pub async fn invoke(
        &self,
        actor_type: &str,
        id: &ActorId,
        action: &str,
        args: Vec<Variant>,
        aborter: Option<Aborter>,
    ) -> Result<Option<Variant>, ActionError> {
        let cache_key = format!("{actor_type}:{}", id.to_text());
        let is_sticky = self
            .registry
            .find_placement(actor_type)
            .and_then(|e| e.placement)
            .map(|p| p.sticky)
            .unwrap_or(false);

        let mut suggestion = if is_sticky { self.sticky_cache.get(&cache_key) } else { None };
        let mut lazy_attempt = suggestion.is_some();
        let mut last_random: Option<String> = None;
        let mut min_migration_version: Option<u64> = None;
        let mut attempt_errors: Vec<ActionError> = Vec::new();
        let mut backoff = ExponentialBackoff::new(self.backoff_budget);

        for round in 0..MAX_ROUNDS {
            if let Some(a) = &aborter {
                if a.is_aborted() {
                    attempt_errors.push(ActionError::framework(
                        FrameworkErrorCode::TransportCallInterrupted,
                        "aborted before attempt",
                    ));
                    return Err(final_invoke_error(attempt_errors));
                }
            }

            let destination = match suggestion.take() {
                Some(dest) => Some(dest),
                None => self.pick_random_destination(actor_type, &mut last_random, min_migration_version, id),
            };
            let lazy = lazy_attempt;
            lazy_attempt = false;

            let Some(destination) = destination else {
                attempt_errors.push(ActionError::framework(
                    FrameworkErrorCode::NoReceiversAvailable,
                    "no receivers available",
                ));
                self.wait(&mut backoff, round, &aborter).await;
                continue;
            };

            let outcome = self
                .remote
                .invoke(InvokeRequest {
                    destination: destination.clone(),
                    actor_type: actor_type.to_string(),
                    id_parts: id.parts().to_vec(),
                    action_name: action.to_string(),
                    args: args.clone(),
                    lazy,
                    aborter: aborter.as_ref().map(Aborter::sub_aborter),
                })
                .await;

            match outcome {
                InvokeOutcome::TransportFailure { code, message } => {
                    attempt_errors.push(ActionError::framework(code, message));
                    self.wait(&mut backoff, round, &aborter).await;
                }
                InvokeOutcome::Content { result, error: None } => {
                    if is_sticky {
                        self.sticky_cache.insert(cache_key, destination);
                    }
                    return Ok(result);
                }
                InvokeOutcome::Content {
                    error: Some(ActionError::Application(app)),
                    ..
                } => return Err(ActionError::Application(app)),
                InvokeOutcome::Content {
                    error: Some(ActionError::Framework(f)),
                    ..
                } => {
                    if is_sticky {
                        self.sticky_cache.invalidate(&cache_key);
                    }
                    let hinted_redirect = f.redirect_destination();
                    if let Some(v) = f.migration_version() {
                        min_migration_version = Some(v);
                    }
                    let skip_wait = hinted_redirect.is_some();
                    if let Some(dest) = hinted_redirect {
                        suggestion = Some(dest);
                    }
                    attempt_errors.push(ActionError::Framework(f));
                    if !skip_wait {
                        self.wait(&mut backoff, round, &aborter).await;
                    }
                }
            }
        }

        Err(final_invoke_error(attempt_errors))
    }

    async fn wait(&self, backoff: &mut ExponentialBackoff, attempt: u32, aborter: &Option<Aborter>) {
        let Some(delay) = backoff.next_delay(attempt) else {
            return;
        };
        match aborter {
            Some(a) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = a.aborted() => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }

    fn pick_random_destination(
        &self,
        actor_type: &str,
        last_random: &mut Option<String>,
        min_migration_version: Option<u64>,
        id: &ActorId,
    ) -> Option<String> {
        let entry = self.registry.find_placement(actor_type)?;
        if let Some(placement) = &entry.placement {
            if let Some(bind_idx) = placement.bind_idx {
                return id.part_at(bind_idx).map(str::to_string);
            }
        }

        let mut candidates: Vec<&str> = entry
            .destinations
            .iter()
            .filter(|d| match (min_migration_version, d.migration_version) {
                (Some(min), Some(v)) => v >= min,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|d| d.app.as_str())
            .collect();
        if candidates.is_empty() {
            return None;
        }
        if candidates.len() > 1 {
            if let Some(last) = last_random.as_deref() {
                candidates.retain(|c| *c != last);
            }
        }
        let picked = candidates.choose(&mut rand::thread_rng())?.to_string();
        *last_random = Some(picked.clone());
        Some(picked)
    }
}

fn final_invoke_error(nested: Vec<ActionError>) -> ActionError {
    let summary = match (nested.first(), nested.last()) {
        (Some(first), Some(last)) if nested.len() > 1 => format!("{first}; ...; {last}"),
        (Some(first), _) => first.to_string(),
        (None, _) => "every destination exhausted without a successful result".to_string(),
    };
    ActionError::Framework(FrameworkError::new(FrameworkErrorCode::InvokeError, summary).with_nested(nested))
}
