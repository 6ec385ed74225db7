//! Error types for Vigil
//!
//! `VigilError` covers conditions that abort a whole run (bad configuration,
//! unreadable target lists). `ProbeError` is local to a single probe and is
//! always folded into a `ProbeOutcome`, never propagated.

use std::io;
use thiserror::Error;

use crate::types::FailureKind;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Campaign interrupted")]
    Cancelled,
}

/// Result type alias for Vigil operations
pub type VigilResult<T> = Result<T, VigilError>;

/// Failure of one probe operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// DNS, connect, TLS or process-launch failure.
    #[error("{0}")]
    Transport(String),

    /// The endpoint answered, but not in a way the probe accepts.
    #[error("{0}")]
    Protocol(String),

    /// Remote credentials were rejected.
    #[error("{0}")]
    Auth(String),

    /// The underlying operation gave up on its own deadline.
    #[error("timed out")]
    Timeout,
}

impl ProbeError {
    /// Outcome category for this error, `None` for timeouts.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ProbeError::Transport(_) => Some(FailureKind::Transport),
            ProbeError::Protocol(_) => Some(FailureKind::Protocol),
            ProbeError::Auth(_) => Some(FailureKind::Auth),
            ProbeError::Timeout => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_error_categories() {
        assert_eq!(
            ProbeError::Transport("dns".into()).failure_kind(),
            Some(FailureKind::Transport)
        );
        assert_eq!(
            ProbeError::Auth("denied".into()).failure_kind(),
            Some(FailureKind::Auth)
        );
        assert_eq!(ProbeError::Timeout.failure_kind(), None);
    }

    #[test]
    fn config_error_display() {
        let e = VigilError::Config("concurrency must be positive".into());
        assert_eq!(e.to_string(), "Configuration error: concurrency must be positive");
    }
}
