//! `InstanceContainer` (§4.2): the LRU collection of wrappers for one actor
//! type on one process. Grounded on the teacher crate's `broker::in_memory`
//! `DashMap`-backed store, generalized with an explicit FIFO order queue
//! for LRU admission and background, non-blocking eviction.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Notify;

use super::wrapper::{ActorBehavior, InstanceWrapper, LockFactory};
use crate::error::ActionError;
use crate::identity::ActorId;

#[derive(Clone)]
enum LiveEntry {
    Ready(Arc<InstanceWrapper>),
    /// Deactivation in flight; `Notify` fires once the wrapper is fully
    /// torn down and removed from `live`.
    Evicting(Arc<Notify>),
}

/// Builds the hosted behavior for a freshly admitted id.
pub type BehaviorFactory = Arc<dyn Fn(&ActorId) -> Arc<dyn ActorBehavior> + Send + Sync>;

pub struct InstanceContainer {
    actor_type: String,
    capacity: usize,
    creator: BehaviorFactory,
    lock_factory: Option<Arc<dyn LockFactory>>,
    live: DashMap<String, LiveEntry>,
    order: SyncMutex<VecDeque<String>>,
    finalizing: AtomicBool,
}

impl InstanceContainer {
    pub fn new(actor_type: impl Into<String>, capacity: usize, creator: BehaviorFactory) -> Arc<Self> {
        Self::with_lock_factory(actor_type, capacity, creator, None)
    }

    pub fn with_lock_factory(
        actor_type: impl Into<String>,
        capacity: usize,
        creator: BehaviorFactory,
        lock_factory: Option<Arc<dyn LockFactory>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            actor_type: actor_type.into(),
            capacity,
            creator,
            lock_factory,
            live: DashMap::new(),
            order: SyncMutex::new(VecDeque::new()),
            finalizing: AtomicBool::new(false),
        })
    }

    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// Returns a wrapper backed by a live instance, creating one on cache
    /// miss. Fails with `FINALIZING` once [`InstanceContainer::finalize`]
    /// has been called.
    pub async fn wrapper(self: &Arc<Self>, id: &ActorId) -> Result<Arc<InstanceWrapper>, ActionError> {
        if self.finalizing.load(Ordering::SeqCst) {
            return Err(ActionError::framework(
                crate::error::FrameworkErrorCode::Finalizing,
                "container is finalizing",
            ));
        }
        let key = id.to_text();
        loop {
            if let Some(notify) = self.wait_if_evicting(&key) {
                notify.notified().await;
                continue;
            }
            match self.live.entry(key.clone()) {
                Entry::Occupied(occupied) => match occupied.get() {
                    LiveEntry::Ready(w) => {
                        let w = w.clone();
                        drop(occupied);
                        self.touch(&key);
                        self.schedule_eviction_if_needed();
                        return Ok(w);
                    }
                    LiveEntry::Evicting(_) => continue,
                },
                Entry::Vacant(vacant) => {
                    let behavior = (self.creator)(id);
                    let w = InstanceWrapper::new(self.actor_type.clone(), id.clone(), behavior, self.lock_factory.clone());
                    vacant.insert(LiveEntry::Ready(w.clone()));
                    self.touch(&key);
                    self.schedule_eviction_if_needed();
                    return Ok(w);
                }
            }
        }
    }

    /// Same operation as [`InstanceContainer::wrapper`]; named separately
    /// to mirror the distilled spec's `obtain`, which returns a proxy the
    /// application holds while `wrapper` is the dispatch path's own lookup.
    pub async fn obtain(self: &Arc<Self>, id: &ActorId) -> Result<Arc<InstanceWrapper>, ActionError> {
        self.wrapper(id).await
    }

    pub async fn delete(self: &Arc<Self>, id: &ActorId) {
        let key = id.to_text();
        let wrapper = match self.live.get(&key).map(|e| e.value().clone()) {
            Some(LiveEntry::Ready(w)) => w,
            _ => return,
        };
        wrapper.deactivate().await;
        self.live.remove(&key);
        self.forget(&key);
    }

    /// Blocks new creations and deactivates every live instance.
    pub async fn finalize(self: &Arc<Self>) {
        self.finalizing.store(true, Ordering::SeqCst);
        let keys: Vec<String> = self.live.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            let wrapper = match self.live.get(&key).map(|e| e.value().clone()) {
                Some(LiveEntry::Ready(w)) => w,
                _ => continue,
            };
            wrapper.deactivate().await;
            self.live.remove(&key);
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|e| matches!(e.value(), LiveEntry::Ready(_))).count()
    }

    fn wait_if_evicting(&self, key: &str) -> Option<Arc<Notify>> {
        match self.live.get(key).map(|e| e.value().clone()) {
            Some(LiveEntry::Evicting(notify)) => Some(notify),
            _ => None,
        }
    }

    fn touch(&self, key: &str) {
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.to_string());
    }

    fn forget(&self, key: &str) {
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
    }

    /// LRU admission: schedules background deactivation of the oldest
    /// ready entries until `live_count() <= capacity`. Does not await the
    /// eviction, so the calling path is never blocked by it.
    fn schedule_eviction_if_needed(self: &Arc<Self>) {
        while self.live_count() > self.capacity {
            let victim_key = {
                let mut order = self.order.lock();
                let idx = order
                    .iter()
                    .position(|k| matches!(self.live.get(k).map(|e| e.value().clone()), Some(LiveEntry::Ready(_))));
                idx.and_then(|i| order.remove(i))
            };
            let Some(victim_key) = victim_key else { break };
            let wrapper = match self.live.get(&victim_key).map(|e| e.value().clone()) {
                Some(LiveEntry::Ready(w)) => w,
                _ => continue,
            };
            let notify = Arc::new(Notify::new());
            self.live.insert(victim_key.clone(), LiveEntry::Evicting(notify.clone()));

            let container = Arc::clone(self);
            tokio::spawn(async move {
                wrapper.deactivate().await;
                container.live.remove(&victim_key);
                notify.notify_waiters();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::wrapper::LockingMode;
    use crate::wire::Variant;
    use async_trait::async_trait;
    use parking_lot::Mutex as PMutex;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Arc as StdArc;

    struct RecordingBehavior {
        store: StdArc<PMutex<StdHashMap<String, Variant>>>,
        id_key: String,
    }

    #[async_trait]
    impl ActorBehavior for RecordingBehavior {
        fn locking_mode(&self, _action: &str) -> LockingMode {
            LockingMode::Exclusive
        }

        async fn activate(&self) -> Result<(), ActionError> {
            Ok(())
        }

        async fn invoke(&self, action: &str, args: Vec<Variant>) -> Result<Option<Variant>, ActionError> {
            match action {
                "echo" => {
                    let value = args.into_iter().next().unwrap_or(Variant::Null);
                    self.store.lock().insert(self.id_key.clone(), value.clone());
                    Ok(Some(value))
                }
                "getLastValue" => Ok(self.store.lock().get(&self.id_key).cloned()),
                other => Err(ActionError::framework(crate::error::FrameworkErrorCode::UnknownAction, other)),
            }
        }
    }

    fn container_with_capacity(capacity: usize) -> (Arc<InstanceContainer>, StdArc<PMutex<StdHashMap<String, Variant>>>) {
        let store: StdArc<PMutex<StdHashMap<String, Variant>>> = StdArc::new(PMutex::new(StdHashMap::new()));
        let store_for_creator = store.clone();
        let creator: BehaviorFactory = Arc::new(move |id: &ActorId| {
            let behavior: Arc<dyn ActorBehavior> = Arc::new(RecordingBehavior {
                store: store_for_creator.clone(),
                id_key: id.to_text(),
            });
            behavior
        });
        (InstanceContainer::new("echoactor", capacity, creator), store)
    }

    #[tokio::test]
    async fn obtain_creates_once_and_reuses_wrapper() {
        let (container, _store) = container_with_capacity(4);
        let id = ActorId::new(vec!["1".into()]);
        let w1 = container.obtain(&id).await.unwrap();
        let w2 = container.obtain(&id).await.unwrap();
        assert!(Arc::ptr_eq(&w1, &w2));
    }

    #[tokio::test]
    async fn eviction_beyond_capacity_deactivates_oldest() {
        let (container, _store) = container_with_capacity(1);
        let id1 = ActorId::new(vec!["1".into()]);
        let id2 = ActorId::new(vec!["2".into()]);

        let w1 = container.obtain(&id1).await.unwrap();
        w1.invoke("echo", vec![Variant::Str("A".into())]).await.unwrap();
        assert!(w1.is_active().await);

        container.obtain(&id2).await.unwrap();

        // Eviction of id1 runs in the background; give it a chance to run.
        for _ in 0..50 {
            if !w1.is_active().await {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(!w1.is_active().await);
    }

    #[tokio::test]
    async fn obtain_after_eviction_reactivates_and_reloads_state() {
        let (container, store) = container_with_capacity(1);
        let id1 = ActorId::new(vec!["1".into()]);
        let id2 = ActorId::new(vec!["2".into()]);

        let w1 = container.obtain(&id1).await.unwrap();
        w1.invoke("echo", vec![Variant::Str("A".into())]).await.unwrap();
        container.obtain(&id2).await.unwrap();

        for _ in 0..50 {
            if container.live_count() <= 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let w1_again = container.obtain(&id1).await.unwrap();
        let result = w1_again.invoke("getLastValue", vec![]).await.unwrap();
        assert_eq!(result, Some(Variant::Str("A".into())));
        assert_eq!(store.lock().get(&id1.to_text()), Some(&Variant::Str("A".into())));
    }

    #[tokio::test]
    async fn delete_deactivates_and_removes() {
        let (container, _store) = container_with_capacity(4);
        let id = ActorId::new(vec!["1".into()]);
        let w = container.obtain(&id).await.unwrap();
        w.invoke("echo", vec![Variant::Bool(true)]).await.unwrap();
        container.delete(&id).await;
        assert!(!w.is_active().await);
        assert_eq!(container.live_count(), 0);
    }

    #[tokio::test]
    async fn finalize_rejects_subsequent_obtain() {
        let (container, _store) = container_with_capacity(4);
        let id = ActorId::new(vec!["1".into()]);
        container.obtain(&id).await.unwrap();
        container.finalize().await;
        let err = container.obtain(&id).await.unwrap_err();
        assert_eq!(err.as_framework().unwrap().code, crate::error::FrameworkErrorCode::Finalizing);
    }
}
