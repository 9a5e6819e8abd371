//! Two app processes, one hosting `EchoActor`, reached over the loopback
//! transport through the full `Runtime` + `RemotePortal` stack.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use virtacor::{
    ActionError, ActorBehavior, ActorId, Config, Destination, FrameworkErrorCode, LockClientError, LockingMode, LoopbackNetwork, ObtainResponse, Placement,
    RegistryClientError, RegistryEntry, RegistryServiceClient, Runtime, Variant,
};

struct NeverPullRegistry;

#[async_trait]
impl RegistryServiceClient for NeverPullRegistry {
    async fn obtain(&self, _nonce: &str, _actor_types: Option<Vec<String>>) -> Result<ObtainResponse, RegistryClientError> {
        std::future::pending().await
    }
    async fn push(&self, _application: &str, _own: HashMap<String, RegistryEntry>) -> Result<(), RegistryClientError> {
        Ok(())
    }
}

struct NoLock;

#[async_trait]
impl virtacor::LockServiceClient for NoLock {
    async fn acquire(&self, _id_key: &str, _requester: &str, ttl: Duration) -> Result<virtacor::AcquireResponse, LockClientError> {
        Ok(virtacor::AcquireResponse { duration: ttl, holders: vec![] })
    }
    async fn release(&self, _id_key: &str, _requester: &str) -> Result<(), LockClientError> {
        Ok(())
    }
}

struct EchoActor {
    last: Mutex<Option<Variant>>,
}

#[async_trait]
impl ActorBehavior for EchoActor {
    fn locking_mode(&self, _action: &str) -> LockingMode {
        LockingMode::Exclusive
    }

    async fn invoke(&self, action: &str, args: Vec<Variant>) -> Result<Option<Variant>, ActionError> {
        match action {
            "echo" => {
                let value = args.into_iter().next();
                *self.last.lock() = value.clone();
                Ok(value)
            }
            "getLastValue" => Ok(self.last.lock().clone()),
            other => Err(ActionError::framework(FrameworkErrorCode::UnknownAction, other)),
        }
    }
}

#[tokio::test]
async fn echo_then_get_last_value_round_trips_across_apps() {
    let net = LoopbackNetwork::new();
    let transport0 = Arc::new(net.register("app0"));
    let transport1 = Arc::new(net.register("app1"));

    let app0 = Runtime::new(
        Config::builder().app_id("app0").build().unwrap(),
        transport0,
        Arc::new(NoLock),
        Arc::new(NeverPullRegistry),
    );
    let app1 = Runtime::new(
        Config::builder().app_id("app1").build().unwrap(),
        transport1,
        Arc::new(NoLock),
        Arc::new(NeverPullRegistry),
    );
    app1.register_actor_type("echoactor", Arc::new(|_id: &ActorId| Arc::new(EchoActor { last: Mutex::new(None) }) as Arc<dyn ActorBehavior>));
    app0.start();
    app1.start();

    app0.registry().register_own(
        "echoactor",
        RegistryEntry {
            destinations: vec![Destination { app: "app1".into(), migration_version: None }],
            placement: Some(Placement { version: 1, bind_idx: None, sticky: false }),
        },
    );

    let id = ActorId::new(vec!["x".into()]);
    let echoed = app0.portal().invoke("echoactor", &id, "echo", vec![Variant::Str("Hello".into())], None).await.unwrap();
    assert_eq!(echoed, Some(Variant::Str("Hello".into())));

    let last = app0.portal().invoke("echoactor", &id, "getLastValue", vec![], None).await.unwrap();
    assert_eq!(last, Some(Variant::Str("Hello".into())));
}
