//! Error types for lapse

use thiserror::Error;

/// Core error type for lapse operations
///
/// Malformed stop-after tags are deliberately absent: they are reported as
/// WARN decisions, never raised.
#[derive(Debug, Error)]
pub enum LapseError {
    /// Structurally broken input to the policy engine. Instructions from a
    /// failed evaluation must not be executed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The snapshot provider could not supply an inventory
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LapseError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn executor(msg: impl Into<String>) -> Self {
        Self::Executor(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the run was aborted before the engine produced decisions
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, LapseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = LapseError::invalid_input("duplicate instance id: i-1");
        assert_eq!(err.to_string(), "Invalid input: duplicate instance id: i-1");
    }

    #[test]
    fn only_provider_failures_are_preconditions() {
        assert!(LapseError::provider_unavailable("timeout").is_precondition_failure());
        assert!(!LapseError::invalid_input("x").is_precondition_failure());
        assert!(!LapseError::executor("x").is_precondition_failure());
    }
}
