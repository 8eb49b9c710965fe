//! File-based store: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `StoredItem`. The whole file is rewritten on
//! every mutation, so it is always a complete, human-inspectable snapshot.
//!
//! Several processes may share one file (a `run` and a `resume`, say). Every
//! operation takes an advisory lock on a sibling `.lock` file and works on a
//! fresh read of the snapshot: shared for reads, exclusive for
//! read-modify-write. Nothing is cached between calls.
//!
//! Storage location: `~/.mailgate/store.jsonl`

use async_trait::async_trait;
use chrono::Utc;
use fs4::FileExt;
use mailgate_core::error::StoreError;
use mailgate_core::store::{DecisionStore, Namespace, StoredItem};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file-backed store using JSONL (one JSON object per line).
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

impl FileStore {
    /// Open a file-based store at the given path.
    ///
    /// The file need not exist yet; it is created on first write. An
    /// unreadable file is an error here rather than on first use.
    pub fn new(path: PathBuf) -> Result<Self, StoreError> {
        let store = Self {
            lock_path: path.with_extension("jsonl.lock"),
            path,
        };
        let count = store.with_snapshot(LockMode::Shared, |items| (items.len(), false))?;
        debug!(path = %store.path.display(), count, "File store opened");
        Ok(store)
    }

    /// Default path: `~/.mailgate/store.jsonl`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".mailgate").join("store.jsonl")
    }

    /// Run `op` on a fresh snapshot while holding the file lock. `op` returns
    /// its result and whether it changed the snapshot; a changed snapshot is
    /// flushed before the lock is released.
    fn with_snapshot<T>(
        &self,
        mode: LockMode,
        op: impl FnOnce(&mut Vec<StoredItem>) -> (T, bool),
    ) -> Result<T, StoreError> {
        let lock = self.open_lock_file()?;
        let locked = match mode {
            LockMode::Shared => FileExt::lock_shared(&lock),
            LockMode::Exclusive => FileExt::lock_exclusive(&lock),
        };
        locked.map_err(|e| {
            StoreError::Unavailable(format!("Failed to lock {}: {e}", self.lock_path.display()))
        })?;

        let result = Self::load_from_disk(&self.path).and_then(|mut items| {
            let (out, changed) = op(&mut items);
            if changed {
                self.flush(&items)?;
            }
            Ok(out)
        });

        if let Err(e) = FileExt::unlock(&lock) {
            warn!(path = %self.lock_path.display(), error = %e, "Failed to release store lock");
        }
        result
    }

    fn open_lock_file(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("Failed to create store directory: {e}"))
            })?;
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| {
                StoreError::Unavailable(format!("Failed to open {}: {e}", self.lock_path.display()))
            })
    }

    fn load_from_disk(path: &Path) -> Result<Vec<StoredItem>, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<StoredItem>(line) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted store line");
                    None
                }
            })
            .collect())
    }

    /// Rewrite the file from `items`. Writes to a sibling temp file and renames
    /// it into place so a crash never leaves a half-written snapshot.
    fn flush(&self, items: &[StoredItem]) -> Result<(), StoreError> {
        let mut content = String::new();
        for item in items {
            let line = serde_json::to_string(item)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            content.push_str(&line);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, &content)
            .map_err(|e| StoreError::Unavailable(format!("Failed to write store file: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Unavailable(format!("Failed to replace store file: {e}")))?;
        Ok(())
    }
}

fn same_entry(item: &StoredItem, namespace: &Namespace, key: &str) -> bool {
    &item.namespace == namespace && item.key == key
}

#[async_trait]
impl DecisionStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<StoredItem>, StoreError> {
        self.with_snapshot(LockMode::Shared, |items| {
            let found = items.iter().find(|i| same_entry(i, namespace, key)).cloned();
            (found, false)
        })
    }

    async fn put(&self, namespace: &Namespace, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let now = Utc::now();
        self.with_snapshot(LockMode::Exclusive, |items| {
            match items.iter_mut().find(|i| same_entry(i, namespace, key)) {
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
            ((), true)
        })
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, StoreError> {
        self.with_snapshot(LockMode::Exclusive, |items| {
            let len_before = items.len();
            items.retain(|i| !same_entry(i, namespace, key));
            let removed = items.len() < len_before;
            (removed, removed)
        })
    }

    async fn search(&self, namespace: &Namespace) -> Result<Vec<StoredItem>, StoreError> {
        self.with_snapshot(LockMode::Shared, |items| {
            let found = items.iter().filter(|i| &i.namespace == namespace).cloned().collect();
            (found, false)
        })
    }
}
