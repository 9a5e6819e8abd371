//! `ActionError`: the tagged sum type that replaces the distilled spec's
//! exceptions-for-control-flow (§9 design notes). The remote portal matches
//! on the `Application`/`Framework` tag rather than catching typed exceptions.
//!
//! Grounded on the teacher crate's `BrokerError`/`SupervisorError`: one
//! `thiserror` variant per failure mode, structured context fields, no
//! string-only errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An error flowing on the wire in a call's `return` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionError {
    /// Raised by user action code. Always surfaced to the caller; the
    /// portal never retries on an application error.
    Application(ApplicationError),
    /// Produced by the runtime. Retryable unless it carries no redirect or
    /// migration hint and the backoff budget is exhausted.
    Framework(FrameworkError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationError {
    pub code: String,
    pub template: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    pub message: String,
    pub stack: Option<String>,
    #[serde(default)]
    pub nested: Vec<ActionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameworkError {
    pub code: FrameworkErrorCode,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    pub message: String,
    pub stack: Option<String>,
    #[serde(default)]
    pub nested: Vec<ActionError>,
}

/// Framework error codes from §7 of the distilled spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum FrameworkErrorCode {
    #[error("UNKNOWN_ACTOR_TYPE")]
    UnknownActorType,
    #[error("UNKNOWN_ACTION")]
    UnknownAction,
    #[error("INCORRECT_STATE")]
    IncorrectState,
    #[error("FINALIZING")]
    Finalizing,
    #[error("ACTOR_LOCK_FAILED")]
    ActorLockFailed,
    #[error("NO_RECEIVERS_AVAILABLE")]
    NoReceiversAvailable,
    #[error("INVOKE_ERROR")]
    InvokeError,
    #[error("MIGRATION_ERROR")]
    MigrationError,
    #[error("TRANSPORT_ERROR")]
    TransportError,
    #[error("TRANSPORT_CALL_TIMEOUT")]
    TransportCallTimeout,
    #[error("TRANSPORT_CALL_INTERRUPTED")]
    TransportCallInterrupted,
    #[error("UNKNOWN_RECEIVER")]
    UnknownReceiver,
    #[error("NO_ACK")]
    NoAck,
}

/// Well-known parameter keys carried in `FrameworkError::parameters`.
pub mod param {
    pub const REDIRECT_DESTINATION: &str = "REDIRECT_DESTINATION";
    pub const MIGRATION_VERSION: &str = "MIGRATION_VERSION";
}

impl FrameworkError {
    pub fn new(code: FrameworkErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            parameters: HashMap::new(),
            message: message.into(),
            stack: None,
            nested: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn with_nested(mut self, nested: Vec<ActionError>) -> Self {
        self.nested = nested;
        self
    }

    pub fn redirect_destination(&self) -> Option<String> {
        self.parameters
            .get(param::REDIRECT_DESTINATION)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    pub fn migration_version(&self) -> Option<u64> {
        self.parameters
            .get(param::MIGRATION_VERSION)
            .and_then(Value::as_u64)
    }

    /// A framework error is retryable unless it's the terminal aggregate
    /// error the portal itself raises after exhausting the backoff budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.code, FrameworkErrorCode::InvokeError)
    }
}

impl ActionError {
    pub fn framework(code: FrameworkErrorCode, message: impl Into<String>) -> Self {
        ActionError::Framework(FrameworkError::new(code, message))
    }

    pub fn as_framework(&self) -> Option<&FrameworkError> {
        match self {
            ActionError::Framework(f) => Some(f),
            ActionError::Application(_) => None,
        }
    }

    pub fn is_application(&self) -> bool {
        matches!(self, ActionError::Application(_))
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Application(e) => write!(f, "application error {}: {}", e.code, e.message),
            ActionError::Framework(e) => write!(f, "framework error {}: {}", e.code, e.message),
        }
    }
}

impl std::error::Error for ActionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_error_json_roundtrip() {
        let err = ActionError::Framework(
            FrameworkError::new(FrameworkErrorCode::ActorLockFailed, "held by app0")
                .with_parameter(param::REDIRECT_DESTINATION, Value::String("app0".into())),
        );
        let json = serde_json::to_string(&err).unwrap();
        let decoded: ActionError = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, err);
        assert_eq!(
            decoded.as_framework().unwrap().redirect_destination(),
            Some("app0".to_string())
        );
    }

    #[test]
    fn migration_error_carries_version() {
        let err = FrameworkError::new(FrameworkErrorCode::MigrationError, "too new")
            .with_parameter(param::MIGRATION_VERSION, Value::from(7u64));
        assert_eq!(err.migration_version(), Some(7));
    }

    #[test]
    fn invoke_error_is_not_retryable_application_errors_always_surface() {
        let invoke = FrameworkError::new(FrameworkErrorCode::InvokeError, "exhausted");
        assert!(!invoke.is_retryable());
        let app = ApplicationError {
            code: "BAD_INPUT".into(),
            template: None,
            parameters: HashMap::new(),
            message: "bad".into(),
            stack: None,
            nested: Vec::new(),
        };
        assert!(ActionError::Application(app).is_application());
    }
}
