//! Decision store: namespaced key-value persistence.
//!
//! Holds both single-document preference profiles and growing preference
//! collections, plus serialized run state. The contract is deliberately
//! small: single-key operations must be atomic, and failures surface as
//! [`StoreError`] rather than as absence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// A short hierarchical path, e.g. `preferences/triage`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(Vec<String>);

impl Namespace {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a `/`-separated path.
    pub fn parse(path: &str) -> Self {
        Self::new(path.split('/').filter(|s| !s.is_empty()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The `/`-joined form used as the storage key prefix.
    pub fn path(&self) -> String {
        self.0.join("/")
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// One stored value with its address and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub namespace: Namespace,
    pub key: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The core DecisionStore trait.
///
/// Implementations: in-memory (for testing), JSON file, SQLite.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "in_memory").
    fn name(&self) -> &str;

    /// Read one value. `Ok(None)` means the key holds no data.
    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<StoredItem>, StoreError>;

    /// Write one value, last writer wins. An overwrite keeps the item's
    /// original insertion position.
    async fn put(&self, namespace: &Namespace, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    /// Remove one value. Returns whether anything was removed.
    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, StoreError>;

    /// All items directly in `namespace`, in insertion order.
    async fn search(&self, namespace: &Namespace) -> Result<Vec<StoredItem>, StoreError>;
}
