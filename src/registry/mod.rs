//! Distributed actor registry (§4.6): which apps host which actor types,
//! maintained via long-poll pull and periodic push.

pub mod client;

pub use client::{
    DistributedActorRegistry, Destination, ObtainResponse, Placement, RegistryClientError, RegistryEntry,
    RegistryServiceClient, PULL_RETRY_DELAY, PUSH_INTERVAL,
};
