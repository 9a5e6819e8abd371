//! A caller-controlled cancellation signal, propagated into a currently
//! awaited remote call (§5 "Cancellation and timeouts").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct Aborter {
    flagged: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Aborter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_aborted(&self) -> bool {
        self.flagged.load(Ordering::SeqCst)
    }

    pub fn abort(&self) {
        self.flagged.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves once [`Aborter::abort`] is called. If already aborted,
    /// resolves immediately on the next poll.
    pub async fn aborted(&self) {
        if self.is_aborted() {
            return;
        }
        self.notify.notified().await;
    }

    /// A child aborter for a sub-operation: aborting `self` aborts the
    /// child, but the child cannot abort its parent.
    pub fn sub_aborter(&self) -> Aborter {
        let child = Aborter::new();
        let parent = self.clone();
        let propagate_to = child.clone();
        tokio::spawn(async move {
            parent.aborted().await;
            propagate_to.abort();
        });
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aborted_resolves_after_abort_call() {
        let aborter = Aborter::new();
        assert!(!aborter.is_aborted());
        let waiter = aborter.clone();
        let handle = tokio::spawn(async move {
            waiter.aborted().await;
        });
        aborter.abort();
        handle.await.unwrap();
        assert!(aborter.is_aborted());
    }

    #[tokio::test]
    async fn already_aborted_resolves_immediately() {
        let aborter = Aborter::new();
        aborter.abort();
        aborter.aborted().await;
    }

    #[tokio::test]
    async fn aborting_parent_propagates_to_sub_aborter() {
        let parent = Aborter::new();
        let child = parent.sub_aborter();
        assert!(!child.is_aborted());
        parent.abort();
        child.aborted().await;
        assert!(child.is_aborted());
    }

    #[tokio::test]
    async fn sub_aborter_can_abort_independently_of_parent() {
        let parent = Aborter::new();
        let child = parent.sub_aborter();
        child.abort();
        assert!(child.is_aborted());
        assert!(!parent.is_aborted());
    }
}
