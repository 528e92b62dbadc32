//! Error types for the Dossier research core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering aggregation, query admission, dispatch, planning, and
//! configuration domains. Nothing here is fatal to a run: admission and
//! aggregation rejections are control signals, and collaborator failures
//! degrade into the stopping-criteria machinery.

use std::path::PathBuf;

/// Top-level error type for the Dossier core library.
#[derive(Debug, thiserror::Error)]
pub enum DossierError {
    #[error("Research error: {0}")]
    Research(#[from] ResearchError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from state mutation at the aggregator and admission boundaries.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// Malformed input to the fact aggregator. Rejected without mutating state.
    #[error("Invalid fact: {reason}")]
    InvalidFact { reason: String },

    /// Query admission rejection. A control signal, not a user-facing error.
    #[error("Duplicate query: {query}")]
    DuplicateQuery { query: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

/// A single query's external execution failed. Recorded against that query;
/// the round proceeds with whatever results succeeded.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatch failed for query '{query}': {message}")]
    Failed { query: String, message: String },

    #[error("Dispatch for query '{query}' timed out after {timeout_secs}s")]
    Timeout { query: String, timeout_secs: u64 },
}

impl DispatchError {
    /// The query this failure is recorded against.
    pub fn query(&self) -> &str {
        match self {
            DispatchError::Failed { query, .. } => query,
            DispatchError::Timeout { query, .. } => query,
        }
    }
}

/// The planner collaborator returned an error rather than a query list.
/// Collapsed into the zero-queries case by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Planner unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `DossierError`.
pub type Result<T> = std::result::Result<T, DossierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_fact() {
        let err = DossierError::Research(ResearchError::InvalidFact {
            reason: "empty claim".into(),
        });
        assert_eq!(err.to_string(), "Research error: Invalid fact: empty claim");
    }

    #[test]
    fn test_error_display_duplicate_query() {
        let err = ResearchError::DuplicateQuery {
            query: "sam altman biography".into(),
        };
        assert_eq!(err.to_string(), "Duplicate query: sam altman biography");
    }

    #[test]
    fn test_dispatch_error_query_accessor() {
        let err = DispatchError::Timeout {
            query: "acme corp lawsuit".into(),
            timeout_secs: 30,
        };
        assert_eq!(err.query(), "acme corp lawsuit");
        assert_eq!(
            err.to_string(),
            "Dispatch for query 'acme corp lawsuit' timed out after 30s"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DossierError = io_err.into();
        assert!(matches!(err, DossierError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DossierError = serde_err.into();
        assert!(matches!(err, DossierError::Serialization(_)));
    }

    #[test]
    fn test_planner_error_display() {
        let err = DossierError::Planner(PlannerError::Unavailable {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "Planner error: Planner unavailable: connection refused"
        );
    }
}
