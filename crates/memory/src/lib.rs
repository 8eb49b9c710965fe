//! Persistence for mailgate: decision store backends, the preference
//! reader/writer layered on top of them, and the run repository.

pub mod defaults;
pub mod file_backend;
pub mod in_memory;
pub mod preferences;
pub mod runs;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
pub use preferences::{
    PreferenceDefaults, PreferenceError, PreferenceManager, PreferenceNamespace, PreferenceShape,
    UpdateSummary,
};
pub use runs::RunRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
