//! Distributed actor lock (§4.5): ensures at-most-one live instance per
//! `(type, id)` cluster-wide via a leased mutex with background refresh.

pub mod client;

pub use client::{AcquireResponse, DistributedActorLock, LockClientError, LockServiceClient, LEASE_TTL, REFRESH_INTERVAL};
