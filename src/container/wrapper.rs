//! Per-instance envelope enforcing locking, activation and lifecycle
//! (§4.1). Grounded on the teacher crate's `supervisor::restart` state
//! machine for the transition discipline, generalized from a fixed
//! restart-policy lifecycle to the distilled spec's
//! `created → activating → active → deactivating → inactive` states.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::{ActionError, FrameworkError, FrameworkErrorCode};
use crate::identity::ActorId;
use crate::wire::Variant;

/// Per-action locking discipline (§4.1). Default is `Exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockingMode {
    None,
    Shared,
    Exclusive,
}

/// The callable surface a hosted actor type exposes through its wrapper.
///
/// Stands in for the distilled spec's reflective "method table": per §9
/// design notes, a small builder registers `(interface, impl)` pairs
/// instead of inspecting runtime metadata.
#[async_trait]
pub trait ActorBehavior: Send + Sync {
    /// Locking mode for one action name. Unknown actions should be
    /// rejected from [`ActorBehavior::invoke`] with `UNKNOWN_ACTION`, not here.
    fn locking_mode(&self, _action: &str) -> LockingMode {
        LockingMode::Exclusive
    }

    /// Runs once, before the first action, under the lifecycle mutex.
    async fn activate(&self) -> Result<(), ActionError> {
        Ok(())
    }

    /// Best-effort: errors are not surfaced, only logged by the caller.
    async fn deactivate(&self) {}

    async fn invoke(&self, action: &str, args: Vec<Variant>) -> Result<Option<Variant>, ActionError>;
}

/// A held distributed lock lease, released on deactivation. Implemented by
/// the `lock` module's client.
#[async_trait]
pub trait LockGuard: Send + Sync {
    async fn release(&self);
}

impl std::fmt::Debug for dyn LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

/// Acquires a distributed lock for one instance id. Implemented by the
/// `lock` module's client; `on_broken` fires at most once, from a detached
/// task, when the lease is lost.
#[async_trait]
pub trait LockFactory: Send + Sync {
    async fn acquire(
        &self,
        id_key: &str,
        on_broken: Arc<dyn Fn() + Send + Sync>,
    ) -> Result<Box<dyn LockGuard>, FrameworkError>;
}

/// A `MIGRATION_ERROR` raised by this wrapper's own activation gate
/// (`ensure_active`, below) propagates verbatim: it's this destination's
/// own schema floor, and the calling portal reads it to raise the
/// migration-version filter for its next attempt. One surfacing from the
/// action body instead came from a *different* destination, reached by a
/// nested call the action made on its own behalf; forwarded as-is it would
/// be misread as this destination's signal, so it gets wrapped here.
fn wrap_nested_migration_error(outcome: Result<Option<Variant>, ActionError>) -> Result<Option<Variant>, ActionError> {
    match outcome {
        Err(ActionError::Framework(nested)) if nested.code == FrameworkErrorCode::MigrationError => Err(ActionError::Framework(
            FrameworkError::new(FrameworkErrorCode::InvokeError, "nested migration error surfaced from action body").with_nested(vec![ActionError::Framework(nested)]),
        )),
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Activating,
    Active,
    Deactivating,
    Inactive,
}

pub struct InstanceWrapper {
    actor_type: String,
    id: ActorId,
    behavior: Arc<dyn ActorBehavior>,
    lock_factory: Option<Arc<dyn LockFactory>>,
    state: Mutex<State>,
    rw: RwLock<()>,
    held_lock: Mutex<Option<Box<dyn LockGuard>>>,
    /// Mirrors `state == Active`, readable without the `state` mutex so
    /// `LockingMode::None` (which bypasses `rw` by design) can still
    /// notice a concurrent `deactivate()` around its dispatch.
    active: AtomicBool,
}

impl std::fmt::Debug for InstanceWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceWrapper")
            .field("actor_type", &self.actor_type)
            .field("id", &self.id)
            .field("active", &self.active.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl InstanceWrapper {
    pub(crate) fn new(
        actor_type: String,
        id: ActorId,
        behavior: Arc<dyn ActorBehavior>,
        lock_factory: Option<Arc<dyn LockFactory>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            actor_type,
            id,
            behavior,
            lock_factory,
            state: Mutex::new(State::Created),
            rw: RwLock::new(()),
            held_lock: Mutex::new(None),
            active: AtomicBool::new(false),
        })
    }

    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Full invoke pipeline: activate-if-needed, per-call locking, dispatch.
    pub async fn invoke(self: &Arc<Self>, action: &str, args: Vec<Variant>) -> Result<Option<Variant>, ActionError> {
        self.ensure_active().await?;

        let outcome = match self.behavior.locking_mode(action) {
            LockingMode::None => {
                if !self.active.load(Ordering::SeqCst) {
                    return Err(ActionError::framework(FrameworkErrorCode::IncorrectState, "instance deactivated before dispatch"));
                }
                let result = self.behavior.invoke(action, args).await;
                if !self.active.load(Ordering::SeqCst) {
                    return Err(ActionError::framework(FrameworkErrorCode::IncorrectState, "instance deactivated during dispatch"));
                }
                result
            }
            LockingMode::Shared => {
                let _guard = self.rw.read().await;
                self.behavior.invoke(action, args).await
            }
            LockingMode::Exclusive => {
                let _guard = self.rw.write().await;
                self.behavior.invoke(action, args).await
            }
        };
        wrap_nested_migration_error(outcome)
    }

    /// Activation pipeline (§4.1). No-op if already active.
    async fn ensure_active(self: &Arc<Self>) -> Result<(), ActionError> {
        let mut state = self.state.lock().await;
        match *state {
            State::Active => return Ok(()),
            State::Created => {}
            State::Activating => {
                return Err(ActionError::framework(
                    FrameworkErrorCode::IncorrectState,
                    "instance is already activating",
                ));
            }
            State::Deactivating | State::Inactive => {
                return Err(ActionError::framework(
                    FrameworkErrorCode::IncorrectState,
                    "instance is deactivating or inactive",
                ));
            }
        }
        *state = State::Activating;

        if let Some(factory) = self.lock_factory.clone() {
            let wrapper = Arc::clone(self);
            let on_broken: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                let wrapper = Arc::clone(&wrapper);
                tokio::spawn(async move {
                    wrapper.deactivate().await;
                });
            });
            match factory.acquire(&self.id.to_text(), on_broken).await {
                Ok(guard) => *self.held_lock.lock().await = Some(guard),
                Err(err) => {
                    self.deactivate_locked(&mut state).await;
                    return Err(ActionError::Framework(err));
                }
            }
        }

        if let Err(err) = self.behavior.activate().await {
            self.deactivate_locked(&mut state).await;
            return Err(err);
        }

        *state = State::Active;
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Deactivation pipeline (§4.1). Idempotent; always releases the held
    /// distributed lock if one was acquired.
    pub async fn deactivate(&self) {
        let mut state = self.state.lock().await;
        self.deactivate_locked(&mut state).await;
    }

    async fn deactivate_locked(&self, state: &mut State) {
        if matches!(*state, State::Created | State::Inactive) {
            return;
        }
        *state = State::Deactivating;
        self.active.store(false, Ordering::SeqCst);
        {
            let _guard = self.rw.write().await;
            self.behavior.deactivate().await;
        }
        if let Some(lock) = self.held_lock.lock().await.take() {
            lock.release().await;
        }
        *state = State::Inactive;
    }

    pub async fn is_active(&self) -> bool {
        matches!(*self.state.lock().await, State::Active)
    }
}
