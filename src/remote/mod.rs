//! Transport-remote (§4.4): call/return correlation, timeouts, and abort
//! propagation layered over the [`crate::transport::Transport`] seam.

pub mod aborter;
pub mod correlator;

pub use aborter::Aborter;
pub use correlator::{InvokeOutcome, InvokeRequest, LocalDispatcher, TransportRemote, CALL_TIMEOUT};
