//! Error types for the mailgate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant; the orchestration crate
//! decides which of them are fatal to a run.

use thiserror::Error;

/// The top-level error type for all mailgate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference collaborator errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Decision store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Review protocol errors ---
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The model answered, but not in the structure the caller demanded.
    #[error("Structurally invalid model output: {0}")]
    InvalidOutput(String),
}

/// Decision store failures.
///
/// Callers must never treat one of these as "no data"; absence is
/// `Ok(None)`, an unreachable backend is `Err(StoreError::Unavailable)`.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Stored value could not be decoded: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Violations of the review request/outcome protocol.
///
/// These indicate a caller or transport bug; the run that receives one is
/// marked failed.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("Outcome '{outcome}' is not permitted for review of '{action}'")]
    OutcomeNotPermitted { action: String, outcome: String },

    #[error("Run {run_id} has no outstanding review request")]
    NoPendingReview { run_id: String },

    #[error("Run {0} not found")]
    RunNotFound(String),

    #[error("Pending action {call_id} is no longer present in the conversation")]
    StaleAction { call_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn protocol_error_names_action_and_outcome() {
        let err = Error::Protocol(ProtocolError::OutcomeNotPermitted {
            action: "ask_question".into(),
            outcome: "edit".into(),
        });
        assert!(err.to_string().contains("ask_question"));
        assert!(err.to_string().contains("edit"));
    }

    #[test]
    fn store_unavailable_is_distinct_from_absence() {
        let err: Error = StoreError::Unavailable("disk gone".into()).into();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
    }
}
