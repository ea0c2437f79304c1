//! Engine error taxonomy.
//!
//! Every operation of the core returns one of these four kinds. Only
//! `Infrastructure` is retryable; the other three are decisions about the
//! caller's input or the entity's current state and must never be confused
//! with a transient outage.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Referenced shift, driver or geofence does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller-supplied data fails a business rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Entity is not in a state compatible with the requested transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Timeout or unavailable datastore / counter store.
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl EngineError {
    /// Stable code for logs and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Validation(_) => "VALIDATION",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::Infrastructure(_) => "INFRASTRUCTURE",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Infrastructure(_))
    }

    pub fn infra(context: &str, err: impl std::fmt::Display) -> Self {
        EngineError::Infrastructure(format!("{context}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_infrastructure_is_retryable() {
        assert!(EngineError::Infrastructure("timeout".into()).is_retryable());
        assert!(!EngineError::Validation("x".into()).is_retryable());
        assert!(!EngineError::Conflict("x".into()).is_retryable());
        assert!(!EngineError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn display_carries_reason() {
        let e = EngineError::Validation("bond at 40.0% of required".into());
        assert_eq!(e.to_string(), "validation failed: bond at 40.0% of required");
        assert_eq!(e.code(), "VALIDATION");
    }
}
