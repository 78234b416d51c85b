//! Error Types
//!
//! Failure taxonomy of the resolution engine. Configuration loading and the
//! binary keep using `anyhow`; everything on the resolution path returns
//! [`PacError`].

use thiserror::Error;

/// Errors produced while acquiring, evaluating or interpreting a PAC script
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacError {
    /// The script could not be read or downloaded
    #[error("failed to fetch PAC script from {location}: {reason}")]
    Fetch { location: String, reason: String },

    /// One proxy spec in the script's answer was malformed
    #[error("malformed proxy spec '{segment}': {reason}")]
    Parse { segment: String, reason: String },

    /// The script failed to parse or threw while running
    #[error("PAC script evaluation failed: {0}")]
    Evaluation(String),

    /// The caller handed in an unusable request
    #[error("invalid resolution request: {0}")]
    Validation(String),

    /// The engine was configured with something it cannot use
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PacError {
    pub(crate) fn fetch(location: impl ToString, reason: impl ToString) -> Self {
        PacError::Fetch {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(segment: impl ToString, reason: impl ToString) -> Self {
        PacError::Parse {
            segment: segment.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is a script failure the resolver may swallow
    pub fn is_evaluation(&self) -> bool {
        matches!(self, PacError::Evaluation(_))
    }
}
