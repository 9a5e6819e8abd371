//! Transport abstraction + in-proc loopback + NATS-like batched bus (§6).

pub mod bus;
pub mod loopback;
pub mod traits;

pub use bus::{BusTransport, PubSubClient, PubSubError};
pub use loopback::{LoopbackNetwork, LoopbackTransport};
pub use traits::{Transport, TransportSendError};
