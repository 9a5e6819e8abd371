//! The persistence-service RPC seam (§6, §4.7): an opaque key-value/table
//! store the envelope talks to. A production binary would back this with
//! the SQLite-shard/projection engine named in the distilled spec's
//! Non-goals; this crate specs only the client contract.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence backend rpc failed: {0}")]
    Rpc(String),
    #[error("baseline conflict: stored value changed since the last load")]
    BaselineConflict,
    #[error("failed to serialize persisted value: {0}")]
    Serialize(String),
    #[error("failed to deserialize persisted value: {0}")]
    Deserialize(String),
}

/// One stored scalar value plus its monotonic write-order version and
/// optional schema revision tag.
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: Vec<u8>,
    pub version: String,
    pub schema_version: Option<u64>,
}

/// One stored table row plus the opaque `baseline` token used for
/// optimistic concurrency.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub value: Vec<u8>,
    pub baseline: String,
}

#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn load(
        &self,
        specifier: &str,
        partition_key: &[String],
        sort_key: &[String],
    ) -> Result<Option<StoredValue>, PersistenceError>;

    async fn store(
        &self,
        specifier: &str,
        partition_key: &[String],
        sort_key: &[String],
        value: Vec<u8>,
        version: String,
        schema_version: Option<u64>,
    ) -> Result<(), PersistenceError>;

    async fn table_get(
        &self,
        specifier: &str,
        partition_key: &[String],
        sort_key: &[String],
    ) -> Result<Option<StoredRow>, PersistenceError>;

    /// Applies only if `baseline` matches what the server currently holds
    /// (first-write-wins). Returns the new baseline on success.
    async fn table_put(
        &self,
        specifier: &str,
        partition_key: &[String],
        sort_key: &[String],
        value: Vec<u8>,
        baseline: Option<String>,
    ) -> Result<String, PersistenceError>;
}
