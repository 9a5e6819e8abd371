//! The `Transport` seam: connect-free send/receive of already-framed wire
//! bytes between apps. Grounded on the teacher crate's `MessageBroker<M>`
//! trait — a generic-constraint seam (§6.2 in the teacher's own docs),
//! implemented here for `LoopbackTransport` (in-proc, §6 "transports: []")
//! and `BusTransport` (NATS-like, §6 "transports: [\"nats\"]").

use async_trait::async_trait;
use thiserror::Error;

/// Failure delivering a frame at the transport layer, distinct from
/// application/framework errors carried inside a decoded envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportSendError {
    #[error("no session for receiver {0}")]
    UnknownReceiver(String),
    #[error("receiver did not ack within the batch window")]
    NoAck,
    #[error("underlying transport error: {0}")]
    Other(String),
}

/// A process-to-process byte pipe for already-encoded [`crate::wire::WireEnvelope`] frames.
///
/// Single-writer per process (§5): callers are expected to serialize sends
/// through the owning transport-remote/system loop rather than fan out
/// concurrent writers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one encoded frame to `destination`. Implementations that batch
    /// (the NATS-like bus) may buffer rather than deliver immediately;
    /// call [`Transport::flush_turn`] to force delivery.
    async fn send(&self, destination: &str, frame: Vec<u8>) -> Result<(), TransportSendError>;

    /// Receive the next frame addressed to this transport's own app id.
    /// Returns `None` once the transport has been closed.
    async fn recv(&self) -> Option<Vec<u8>>;

    /// Force delivery of anything buffered for the current scheduling turn.
    /// The in-proc loopback transport has nothing to buffer; the default
    /// no-op covers it.
    async fn flush_turn(&self) {}
}
