//! Run state repository over the decision store (`runs/<run-id>`).

use mailgate_core::error::StoreError;
use mailgate_core::run::{RunId, RunState, RunStatus};
use mailgate_core::store::{DecisionStore, Namespace};
use std::sync::Arc;
use tracing::debug;

/// Saves and loads [`RunState`] snapshots.
#[derive(Clone)]
pub struct RunRepository {
    store: Arc<dyn DecisionStore>,
    namespace: Namespace,
}

impl RunRepository {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self {
            store,
            namespace: Namespace::new(["runs"]),
        }
    }

    pub async fn save(&self, state: &RunState) -> Result<(), StoreError> {
        let value = serde_json::to_value(state).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.put(&self.namespace, state.id.as_str(), value).await?;
        debug!(run_id = %state.id, status = ?state.status, "Run state saved");
        Ok(())
    }

    /// `Ok(None)` when no run has this id.
    pub async fn load(&self, id: &RunId) -> Result<Option<RunState>, StoreError> {
        match self.store.get(&self.namespace, id.as_str()).await? {
            Some(item) => serde_json::from_value(item.value)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("run {id}: {e}"))),
            None => Ok(None),
        }
    }

    /// Every stored run, oldest first.
    pub async fn list(&self) -> Result<Vec<RunState>, StoreError> {
        self.store
            .search(&self.namespace)
            .await?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item.value)
                    .map_err(|e| StoreError::Serialization(format!("run {}: {e}", item.key)))
            })
            .collect()
    }

    /// Runs waiting on a review outcome.
    pub async fn suspended(&self) -> Result<Vec<RunState>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|run| run.status == RunStatus::Suspended)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryStore;
    use mailgate_core::inbound::InboundMessage;
    use mailgate_core::review::{ActionRequest, ReviewPermissions, ReviewRequest};
    use mailgate_core::run::Continuation;

    fn message() -> InboundMessage {
        InboundMessage::new("alice@example.com", "me@example.com", "Sync", "Can we meet?")
    }

    #[tokio::test]
    async fn save_and_load() {
        let repo = RunRepository::new(Arc::new(InMemoryStore::new()));
        let state = RunState::new(message());
        repo.save(&state).await.unwrap();

        let loaded = repo.load(&state.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, state.id);
        assert_eq!(loaded.message, state.message);
        assert!(repo.load(&RunId::from("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn suspended_filters_by_status() {
        let repo = RunRepository::new(Arc::new(InMemoryStore::new()));

        let mut waiting = RunState::new(message());
        waiting.suspend(
            Continuation::TriageReview,
            ReviewRequest {
                action_request: ActionRequest {
                    action: "Email Assistant: notify".into(),
                    args: serde_json::json!({}),
                },
                permissions: ReviewPermissions::TRIAGE,
                description: String::new(),
            },
        );
        repo.save(&waiting).await.unwrap();

        let mut done = RunState::new(message());
        done.complete(mailgate_core::run::CompletionReason::Ignored);
        repo.save(&done).await.unwrap();

        let suspended = repo.suspended().await.unwrap();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].id, waiting.id);
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }
}
