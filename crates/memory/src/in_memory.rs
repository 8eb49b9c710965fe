//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use mailgate_core::error::StoreError;
use mailgate_core::store::{DecisionStore, Namespace, StoredItem};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store that keeps items in insertion order.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone)]
pub struct InMemoryStore {
    items: Arc<RwLock<Vec<StoredItem>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Total number of items across all namespaces.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<StoredItem>, StoreError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .find(|i| &i.namespace == namespace && i.key == key)
            .cloned())
    }

    async fn put(&self, namespace: &Namespace, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| &i.namespace == namespace && i.key == key) {
            Some(existing) => {
                existing.value = value;
                existing.updated_at = now;
            }
            None => items.push(StoredItem {
                namespace: namespace.clone(),
                key: key.to_string(),
                value,
                created_at: now,
                updated_at: now,
            }),
        }
        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, StoreError> {
        let mut items = self.items.write().await;
        let len_before = items.len();
        items.retain(|i| !(&i.namespace == namespace && i.key == key));
        Ok(items.len() < len_before)
    }

    async fn search(&self, namespace: &Namespace) -> Result<Vec<StoredItem>, StoreError> {
        let items = self.items.read().await;
        Ok(items.iter().filter(|i| &i.namespace == namespace).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ns(name: &str) -> Namespace {
        Namespace::new(["preferences", name])
    }

    #[tokio::test]
    async fn put_and_get() {
        let store = InMemoryStore::new();
        store.put(&ns("triage"), "current", json!("rules")).await.unwrap();

        let item = store.get(&ns("triage"), "current").await.unwrap().unwrap();
        assert_eq!(item.value, json!("rules"));
        assert!(store.get(&ns("calendar"), "current").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overwrite_keeps_single_entry_and_position() {
        let store = InMemoryStore::new();
        store.put(&ns("background"), "a", json!("first")).await.unwrap();
        store.put(&ns("background"), "b", json!("second")).await.unwrap();
        store.put(&ns("background"), "a", json!("first, revised")).await.unwrap();

        let items = store.search(&ns("background")).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "a");
        assert_eq!(items[0].value, json!("first, revised"));
        assert_eq!(items[1].key, "b");
    }

    #[tokio::test]
    async fn search_is_scoped_to_namespace() {
        let store = InMemoryStore::new();
        store.put(&ns("triage"), "current", json!("x")).await.unwrap();
        store.put(&ns("calendar"), "current", json!("y")).await.unwrap();
        assert_eq!(store.search(&ns("triage")).await.unwrap().len(), 1);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn delete_entry() {
        let store = InMemoryStore::new();
        store.put(&ns("background"), "k", json!("v")).await.unwrap();
        assert!(store.delete(&ns("background"), "k").await.unwrap());
        assert!(!store.delete(&ns("background"), "k").await.unwrap());
        assert!(store.is_empty().await);
    }
}
