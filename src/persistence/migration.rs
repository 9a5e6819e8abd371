//! Schema-version gate for persisted scalars (§4.7): before a value
//! from an older runtime version is accepted, the consuming process
//! must declare it can actually read it.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{param, ActionError, FrameworkError, FrameworkErrorCode};

use super::scalar::Persistable;
use super::service::PersistenceService;

/// Declares the highest persisted schema version this process understands.
/// A persisted value tagged with a newer `schema_version` than
/// `max_supported_version()` cannot be safely deserialized.
pub trait MigrationController: Send + Sync {
    fn max_supported_version(&self) -> u64;
}

/// Wraps a scalar [`Persistable`], gating `load()` on schema compatibility.
pub struct MigrationEnvelope<T, C> {
    inner: Persistable<T>,
    controller: Arc<C>,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Clone, C: MigrationController> MigrationEnvelope<T, C> {
    pub fn new(
        service: Arc<dyn PersistenceService>,
        specifier: impl Into<String>,
        partition_key: Vec<String>,
        sort_key: Vec<String>,
        controller: Arc<C>,
    ) -> Self {
        Self {
            inner: Persistable::new(service, specifier, partition_key, sort_key),
            controller,
            _marker: PhantomData,
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.inner.value()
    }

    pub fn change(&mut self, value: T) {
        self.inner.change(value)
    }

    pub async fn store(&mut self, force: bool) -> Result<(), ActionError> {
        self.inner.store(force).await.map_err(persistence_error)
    }

    /// Loads the persisted value, rejecting it with
    /// `FrameworkErrorCode::MigrationError` if its schema version is newer
    /// than this process supports.
    pub async fn load(&mut self) -> Result<(), ActionError> {
        self.inner.load().await.map_err(persistence_error)?;
        if let Some(found) = self.inner.schema_version() {
            let max = self.controller.max_supported_version();
            if found > max {
                return Err(ActionError::Framework(
                    FrameworkError::new(FrameworkErrorCode::MigrationError, format!("persisted schema version {found} exceeds max supported version {max}"))
                        .with_parameter(param::MIGRATION_VERSION, serde_json::Value::String(found.to_string())),
                ));
            }
        }
        Ok(())
    }
}

fn persistence_error(err: super::service::PersistenceError) -> ActionError {
    ActionError::Framework(FrameworkError::new(FrameworkErrorCode::TransportError, err.to_string()))
}
