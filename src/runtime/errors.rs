//! Runtime-level errors (§3.2), following the teacher's `SystemError`
//! one-variant-per-failure-mode shape.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime is already started")]
    AlreadyStarted,
    #[error("runtime is not started")]
    NotStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_carries_message() {
        let err = RuntimeError::InvalidConfig("bad ttl".to_string());
        assert!(err.to_string().contains("bad ttl"));
    }
}
