//! NATS-like message-bus transport (§6): outbound frames per receiver are
//! buffered for one scheduling turn (or until the batch exceeds 10,000
//! bytes), then sent as a single `wire::batch` frame. The receiver must ack
//! the batch within 4s or the send fails with `NO_ACK`.
//!
//! The actual pub/sub broker (NATS) is out of scope per the distilled
//! spec's Non-goals; this module specs the client-side batching/ack engine
//! against the [`PubSubClient`] seam. A production binary wires that seam
//! to a real client (e.g. `async-nats`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use super::traits::{Transport, TransportSendError};
use crate::wire::batch::{decode_batch, encode_batch};

/// Flush threshold from §6: "buffered for one scheduling turn, then sent...
/// or when the batch exceeds 10,000 bytes".
pub const FLUSH_THRESHOLD_BYTES: usize = 10_000;

/// Ack deadline from §6.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("publish to {subject} failed: {reason}")]
    PublishFailed { subject: String, reason: String },
    #[error("no ack received for {subject} within the deadline")]
    AckTimeout { subject: String },
}

/// Client-side contract for the underlying pub/sub bus.
#[async_trait]
pub trait PubSubClient: Send + Sync + 'static {
    /// Publish a raw batch frame to `subject` and wait (up to `timeout`)
    /// for an ack. An empty response body is a successful ack.
    async fn publish_and_ack(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<(), PubSubError>;
}

struct PendingBatch {
    messages: Vec<Vec<u8>>,
    bytes: usize,
}

impl PendingBatch {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            bytes: 0,
        }
    }
}

/// Batched bus transport over a [`PubSubClient`].
pub struct BusTransport<C: PubSubClient> {
    app_id: String,
    client: Arc<C>,
    pending: Arc<DashMap<String, Mutex<PendingBatch>>>,
    inbox: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    inbox_sender: mpsc::UnboundedSender<Vec<u8>>,
}

impl<C: PubSubClient> BusTransport<C> {
    pub fn new(app_id: impl Into<String>, client: Arc<C>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            app_id: app_id.into(),
            client,
            pending: Arc::new(DashMap::new()),
            inbox: Arc::new(Mutex::new(rx)),
            inbox_sender: tx,
        }
    }

    /// Feed a raw batch frame received from the bus (already addressed to
    /// this app) into the local inbox, for use by a bus-polling task.
    pub fn deliver_incoming_batch(&self, raw: &[u8]) -> Result<(), crate::wire::batch::BatchError> {
        for message in decode_batch(raw)? {
            let _ = self.inbox_sender.send(message);
        }
        Ok(())
    }

    async fn flush_one(&self, destination: &str) -> Result<(), TransportSendError> {
        let Some(entry) = self.pending.get(destination) else {
            return Ok(());
        };
        let mut batch = entry.lock().await;
        if batch.messages.is_empty() {
            return Ok(());
        }
        let frame = encode_batch(&batch.messages);
        self.client
            .publish_and_ack(destination, frame, ACK_TIMEOUT)
            .await
            .map_err(|e| match e {
                PubSubError::AckTimeout { .. } => TransportSendError::NoAck,
                PubSubError::PublishFailed { reason, .. } => TransportSendError::Other(reason),
            })?;
        batch.messages.clear();
        batch.bytes = 0;
        Ok(())
    }
}

#[async_trait]
impl<C: PubSubClient> Transport for BusTransport<C> {
    async fn send(&self, destination: &str, frame: Vec<u8>) -> Result<(), TransportSendError> {
        let should_flush = {
            let entry = self
                .pending
                .entry(destination.to_string())
                .or_insert_with(|| Mutex::new(PendingBatch::new()));
            let mut batch = entry.lock().await;
            batch.bytes += frame.len();
            batch.messages.push(frame);
            batch.bytes >= FLUSH_THRESHOLD_BYTES
        };
        if should_flush {
            self.flush_one(destination).await?;
        }
        Ok(())
    }

    async fn recv(&self) -> Option<Vec<u8>> {
        self.inbox.lock().await.recv().await
    }

    async fn flush_turn(&self) {
        let destinations: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for destination in destinations {
            let _ = self.flush_one(&destination).await;
        }
    }
}

impl<C: PubSubClient> BusTransport<C> {
    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}
