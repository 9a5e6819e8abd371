//! In-process loopback transport, used when `config.transports` is empty
//! (§6). All apps in the test/demo process share one [`LoopbackNetwork`];
//! each app registers a [`LoopbackTransport`] endpoint against it.
//!
//! Grounded on the teacher crate's `broker::in_memory::InMemoryMessageBroker`:
//! a `DashMap`-backed directory of per-recipient `mpsc` senders.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};

use super::traits::{Transport, TransportSendError};

/// Shared directory of app-id → inbox, backing every [`LoopbackTransport`]
/// registered against it.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    directory: Arc<DashMap<String, mpsc::UnboundedSender<Vec<u8>>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint for `app_id`. Re-registering the same
    /// `app_id` replaces the previous endpoint's inbox.
    pub fn register(&self, app_id: impl Into<String>) -> LoopbackTransport {
        let app_id = app_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.directory.insert(app_id.clone(), tx);
        LoopbackTransport {
            app_id,
            directory: self.directory.clone(),
            inbox: Arc::new(Mutex::new(rx)),
        }
    }
}

#[derive(Clone)]
pub struct LoopbackTransport {
    app_id: String,
    directory: Arc<DashMap<String, mpsc::UnboundedSender<Vec<u8>>>>,
    inbox: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl LoopbackTransport {
    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, destination: &str, frame: Vec<u8>) -> Result<(), TransportSendError> {
        let sender = self
            .directory
            .get(destination)
            .ok_or_else(|| TransportSendError::UnknownReceiver(destination.to_string()))?;
        sender
            .send(frame)
            .map_err(|_| TransportSendError::UnknownReceiver(destination.to_string()))
    }

    async fn recv(&self) -> Option<Vec<u8>> {
        self.inbox.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_frame_between_two_registered_apps() {
        let net = LoopbackNetwork::new();
        let app0 = net.register("app0");
        let app1 = net.register("app1");

        app0.send("app1", b"hello".to_vec()).await.unwrap();
        assert_eq!(app1.recv().await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn sending_to_unknown_receiver_fails() {
        let net = LoopbackNetwork::new();
        let app0 = net.register("app0");
        let err = app0.send("ghost", b"hi".to_vec()).await.unwrap_err();
        assert_eq!(err, TransportSendError::UnknownReceiver("ghost".to_string()));
    }
}
