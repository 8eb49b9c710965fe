//! Wiring shared by the commands: config loading, store selection and
//! assembly of the workflow controller from its collaborators.

use anyhow::Context;
use mailgate_agent::{ActionCatalog, ActionLoop, Classifier, SuspensionGate, WorkflowController};
use mailgate_config::{AppConfig, PreferenceOverrides, StoreBackend, StoreConfig};
use mailgate_core::event::EventBus;
use mailgate_core::store::DecisionStore;
use mailgate_memory::{FileStore, InMemoryStore, PreferenceDefaults, PreferenceManager, RunRepository, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_path(path),
        None => AppConfig::load(),
    };
    config.context("Failed to load config")
}

/// Open the decision store the config names.
pub async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn DecisionStore>> {
    let store: Arc<dyn DecisionStore> = match config.backend {
        StoreBackend::Sqlite => {
            let path = config.resolved_path();
            ensure_parent(&path)?;
            let store = SqliteStore::new(&path.to_string_lossy())
                .await
                .with_context(|| format!("Failed to open SQLite store at {}", path.display()))?;
            info!(path = %path.display(), "Opened SQLite decision store");
            Arc::new(store)
        }
        StoreBackend::File => {
            let path = config.resolved_path();
            ensure_parent(&path)?;
            let store = FileStore::new(path.clone())
                .with_context(|| format!("Failed to open file store at {}", path.display()))?;
            info!(path = %path.display(), "Opened file decision store");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; runs will not survive this process");
            Arc::new(InMemoryStore::new())
        }
    };
    Ok(store)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// Seed content with any config overrides applied.
pub fn preference_defaults(overrides: &PreferenceOverrides) -> PreferenceDefaults {
    let mut defaults = PreferenceDefaults::default();
    if let Some(triage) = &overrides.triage {
        defaults.triage = triage.clone();
    }
    if let Some(style) = &overrides.response_style {
        defaults.response_style = style.clone();
    }
    if let Some(calendar) = &overrides.calendar {
        defaults.calendar = calendar.clone();
    }
    if let Some(background) = &overrides.background {
        defaults.background = background.clone();
    }
    defaults
}

/// Everything a command needs to start, resume or inspect runs.
pub struct Runtime {
    pub controller: WorkflowController,
    pub prefs: Arc<PreferenceManager>,
    pub runs: RunRepository,
}

impl Runtime {
    pub async fn build(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store = open_store(&config.store).await?;
        let provider = mailgate_providers::build_from_config(&config)
            .context("Failed to build the language-model provider")?;
        let event_bus = Arc::new(EventBus::default());

        let prefs = Arc::new(
            PreferenceManager::new(store.clone(), provider.clone(), config.extraction_model())
                .with_defaults(preference_defaults(&config.preferences))
                .with_read_fallback(config.store.fallback_to_defaults_on_read_error)
                .with_event_bus(event_bus.clone()),
        );

        let catalog = Arc::new(
            ActionCatalog::new(Arc::new(mailgate_tools::default_registry()))
                .with_reviewable(config.review.reviewable_actions.iter().cloned())
                .with_event_bus(event_bus.clone()),
        );
        let gate = Arc::new(
            SuspensionGate::new(catalog, prefs.clone()).with_event_bus(event_bus.clone()),
        );

        let classifier = Classifier::new(provider.clone(), &config.default_model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);
        let action_loop = ActionLoop::new(provider, &config.default_model, gate.clone(), prefs.clone())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_max_iterations(config.agent.max_iterations);

        let runs = RunRepository::new(store);
        let controller = WorkflowController::new(classifier, action_loop, gate, prefs.clone(), runs.clone())
            .with_event_bus(event_bus);

        Ok(Self {
            controller,
            prefs,
            runs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_the_named_seeds() {
        let overrides = PreferenceOverrides {
            calendar: Some("Mornings only".into()),
            ..PreferenceOverrides::default()
        };
        let defaults = preference_defaults(&overrides);
        assert_eq!(defaults.calendar, "Mornings only");
        assert_eq!(defaults.triage, PreferenceDefaults::default().triage);
    }

    #[tokio::test]
    async fn memory_backend_needs_no_path() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        assert!(open_store(&config).await.is_ok());
    }

    #[tokio::test]
    async fn file_backend_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::File,
            path: Some(dir.path().join("nested").join("decisions.json")),
            ..StoreConfig::default()
        };
        open_store(&config).await.unwrap();
        assert!(dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn runtime_requires_a_provider() {
        let config = AppConfig {
            api_key: None,
            api_url: "https://api.openai.com/v1".into(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
                ..StoreConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(Runtime::from_config(config).await.is_err());
    }

    #[tokio::test]
    async fn local_endpoint_builds_runtime() {
        let config = AppConfig {
            api_url: "http://localhost:11434/v1".into(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
                ..StoreConfig::default()
            },
            ..AppConfig::default()
        };
        let runtime = Runtime::from_config(config).await.unwrap();
        assert!(runtime.runs.suspended().await.unwrap().is_empty());
    }
}
