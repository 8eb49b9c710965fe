//! Errors that end a run.

use mailgate_core::error::{ProtocolError, ProviderError, StoreError};
use mailgate_core::run::RunId;
use mailgate_memory::PreferenceError;
use thiserror::Error;

/// A failure that stops the current run. Tool failures never show up here:
/// the action loop turns them into tool-result entries.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The classifier's output was not one of the three dispositions
    #[error("Classifier failed: {0}")]
    Classifier(String),

    /// The model proposed an action nobody can handle
    #[error("Model proposed unknown action '{0}'")]
    UnknownAction(String),

    #[error("Inference failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Preference update failed: {0}")]
    Preference(#[from] PreferenceError),

    #[error("Review protocol violated: {0}")]
    Protocol(#[from] ProtocolError),
}

impl AgentError {
    /// Short label for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Classifier(_) | AgentError::UnknownAction(_) | AgentError::Provider(_) => {
                "collaborator"
            }
            AgentError::Store(_) => "store",
            AgentError::Preference(_) => "preference",
            AgentError::Protocol(_) => "protocol",
        }
    }
}

/// A fatal error together with the run it ended. The run has already been
/// persisted as failed, unless the store itself was the problem.
#[derive(Debug, Error)]
#[error("Run {run_id} failed: {source}")]
pub struct RunError {
    pub run_id: RunId,
    #[source]
    pub source: AgentError,
}

impl RunError {
    pub fn new(run_id: RunId, source: AgentError) -> Self {
        Self { run_id, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(AgentError::UnknownAction("x".into()).kind(), "collaborator");
        let protocol: AgentError = ProtocolError::NoPendingReview { run_id: "r".into() }.into();
        assert_eq!(protocol.kind(), "protocol");
        assert!(protocol.to_string().contains("no outstanding review request"));

        let run = RunError::new(RunId::from("r1"), protocol);
        assert!(run.to_string().starts_with("Run r1 failed"));
        assert!(std::error::Error::source(&run).is_some());
    }
}
