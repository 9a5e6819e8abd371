//! Runtime wiring (§3.3): composes transport, remote correlator, lock,
//! registry, portal and the per-actor-type instance containers into one
//! handle, with ordered start/stop mirroring the teacher's `ActorSystem`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::container::{BehaviorFactory, InstanceContainer, LockFactory};
use crate::error::{ActionError, FrameworkErrorCode};
use crate::identity::ActorId;
use crate::lock::{DistributedActorLock, LockServiceClient};
use crate::registry::{DistributedActorRegistry, RegistryServiceClient};
use crate::remote::{LocalDispatcher, TransportRemote};
use crate::transport::Transport;
use crate::wire::Variant;

use super::config::Config;

/// Routes an inbound call to the instance container for its actor type.
/// Held by [`TransportRemote`] on this process's behalf.
struct RuntimeDispatcher {
    containers: DashMap<String, Arc<InstanceContainer>>,
}

#[async_trait]
impl LocalDispatcher for RuntimeDispatcher {
    async fn dispatch(&self, actor_type: &str, id_parts: &[String], action_name: &str, args: Vec<Variant>, _lazy: bool) -> Result<Option<Variant>, ActionError> {
        let container = self
            .containers
            .get(actor_type)
            .map(|entry| entry.clone())
            .ok_or_else(|| ActionError::framework(FrameworkErrorCode::UnknownActorType, actor_type))?;
        let id = ActorId::new(id_parts.to_vec());
        let wrapper = container.wrapper(&id).await?;
        wrapper.invoke(action_name, args).await
    }
}

/// One process's virtual-actor runtime: owns the containers hosting this
/// app's actor types, and the client stack for reaching every other app.
pub struct Runtime<T: Transport + 'static, L: LockServiceClient + 'static, R: RegistryServiceClient + 'static> {
    config: Config,
    dispatcher: Arc<RuntimeDispatcher>,
    remote: Arc<TransportRemote<T>>,
    lock_factory: Arc<dyn LockFactory>,
    registry: Arc<DistributedActorRegistry<R>>,
    portal: Arc<crate::portal::RemotePortal<R, T>>,
    _lock_client: std::marker::PhantomData<L>,
}

impl<T: Transport + 'static, L: LockServiceClient + 'static, R: RegistryServiceClient + 'static> Runtime<T, L, R> {
    pub fn new(config: Config, transport: Arc<T>, lock_client: Arc<L>, registry_client: Arc<R>) -> Self {
        let dispatcher = Arc::new(RuntimeDispatcher { containers: DashMap::new() });
        let remote = Arc::new(TransportRemote::new(config.app_id.clone(), transport, dispatcher.clone() as Arc<dyn LocalDispatcher>));
        let lock_factory: Arc<dyn LockFactory> = Arc::new(DistributedActorLock::new(config.app_id.clone(), lock_client));
        let registry = DistributedActorRegistry::new(config.app_id.clone(), registry_client);
        let portal = Arc::new(
            crate::portal::RemotePortal::new(registry.clone(), remote.clone(), config.sticky_cache_capacity).with_backoff_budget(config.backoff_budget),
        );
        Self {
            config,
            dispatcher,
            remote,
            lock_factory,
            registry,
            portal,
            _lock_client: std::marker::PhantomData,
        }
    }

    /// Admits a hosted actor type, backed by a fresh lock-guarded instance
    /// container. Must be called before the type can serve inbound calls.
    pub fn register_actor_type(&self, actor_type: impl Into<String>, creator: BehaviorFactory) -> Arc<InstanceContainer> {
        let actor_type = actor_type.into();
        let container = InstanceContainer::with_lock_factory(actor_type.clone(), self.config.container_capacity, creator, Some(self.lock_factory.clone()));
        self.dispatcher.containers.insert(actor_type, container.clone());
        container
    }

    pub fn portal(&self) -> Arc<crate::portal::RemotePortal<R, T>> {
        self.portal.clone()
    }

    pub fn registry(&self) -> Arc<DistributedActorRegistry<R>> {
        self.registry.clone()
    }

    pub fn app_id(&self) -> &str {
        self.remote.app_id()
    }

    /// Ordered start: the receive loop comes up first so inbound calls can
    /// be served the moment the registry starts advertising this app.
    pub fn start(&self) {
        tokio::spawn(self.remote.clone().run_receive_loop());
        self.registry.start();
    }

    pub async fn stop(&self) {
        self.registry.stop().await;
    }
}
