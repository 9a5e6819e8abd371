//! Monitoring error type, shaped like this crate's own `{Event, EventKind}`
//! pairing (`types.rs`) rather than one flat variant per failing method.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStage {
    Record,
    Snapshot,
    Reset,
}

impl std::fmt::Display for MonitorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Record => "record",
            Self::Snapshot => "snapshot",
            Self::Reset => "reset",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
#[error("monitor {stage} failed: {message}")]
pub struct MonitoringError {
    pub stage: MonitorStage,
    pub message: String,
}

impl MonitoringError {
    pub fn record(message: impl Into<String>) -> Self {
        Self { stage: MonitorStage::Record, message: message.into() }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Self { stage: MonitorStage::Snapshot, message: message.into() }
    }

    pub fn reset(message: impl Into<String>) -> Self {
        Self { stage: MonitorStage::Reset, message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_message_both_surface_in_display() {
        let err = MonitoringError::snapshot("history lock poisoned");
        assert_eq!(err.stage, MonitorStage::Snapshot);
        assert!(err.to_string().contains("snapshot"));
        assert!(err.to_string().contains("history lock poisoned"));
    }
}
