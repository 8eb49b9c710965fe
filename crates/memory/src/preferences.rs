//! Preference reader/writer.
//!
//! Four fixed namespaces live under `preferences/`. Three are *profiles*: a
//! single document under the key `current`, replaced wholesale on update.
//! `background` is a *collection* of discrete entries under generated keys,
//! only ever added to or removed from.
//!
//! Updates go through an extraction model. The current content is always
//! shown to the extractor, and a profile update that would blank a
//! non-empty profile is refused.

use crate::defaults;
use chrono::Utc;
use mailgate_core::error::{ProviderError, StoreError};
use mailgate_core::event::{DomainEvent, EventBus};
use mailgate_core::message::Message;
use mailgate_core::provider::{Provider, ProviderRequest, ResponseFormat};
use mailgate_core::store::{DecisionStore, Namespace, StoredItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Key holding a profile's single document.
pub const PROFILE_KEY: &str = "current";

/// Key of the entry seeded into an empty collection. Fixed so concurrent
/// first reads converge on one entry.
pub const SEED_KEY: &str = "seed";

/// Separator used when a collection is rendered as one string.
pub const COLLECTION_SEPARATOR: &str = "\n";

/// The preference namespaces the assistant reads and learns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceNamespace {
    Triage,
    ResponseStyle,
    Calendar,
    Background,
}

/// Storage shape of a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceShape {
    Profile,
    Collection,
}

impl PreferenceNamespace {
    pub const ALL: [PreferenceNamespace; 4] = [
        PreferenceNamespace::Triage,
        PreferenceNamespace::ResponseStyle,
        PreferenceNamespace::Calendar,
        PreferenceNamespace::Background,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceNamespace::Triage => "triage",
            PreferenceNamespace::ResponseStyle => "response_style",
            PreferenceNamespace::Calendar => "calendar",
            PreferenceNamespace::Background => "background",
        }
    }

    pub fn shape(&self) -> PreferenceShape {
        match self {
            PreferenceNamespace::Background => PreferenceShape::Collection,
            _ => PreferenceShape::Profile,
        }
    }

    /// The store namespace, `preferences/<name>`.
    pub fn namespace(&self) -> Namespace {
        Namespace::new(["preferences", self.as_str()])
    }

    fn index(&self) -> usize {
        match self {
            PreferenceNamespace::Triage => 0,
            PreferenceNamespace::ResponseStyle => 1,
            PreferenceNamespace::Calendar => 2,
            PreferenceNamespace::Background => 3,
        }
    }
}

impl std::fmt::Display for PreferenceNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PreferenceNamespace {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "triage" => Ok(PreferenceNamespace::Triage),
            "response_style" | "response" => Ok(PreferenceNamespace::ResponseStyle),
            "calendar" | "cal" => Ok(PreferenceNamespace::Calendar),
            "background" => Ok(PreferenceNamespace::Background),
            other => Err(PreferenceError::UnknownNamespace(other.to_string())),
        }
    }
}

/// Seed content per namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceDefaults {
    pub triage: String,
    pub response_style: String,
    pub calendar: String,
    pub background: String,
}

impl PreferenceDefaults {
    pub fn get(&self, namespace: PreferenceNamespace) -> &str {
        match namespace {
            PreferenceNamespace::Triage => &self.triage,
            PreferenceNamespace::ResponseStyle => &self.response_style,
            PreferenceNamespace::Calendar => &self.calendar,
            PreferenceNamespace::Background => &self.background,
        }
    }
}

impl Default for PreferenceDefaults {
    fn default() -> Self {
        Self {
            triage: defaults::DEFAULT_TRIAGE.to_string(),
            response_style: defaults::DEFAULT_RESPONSE_STYLE.to_string(),
            calendar: defaults::DEFAULT_CALENDAR.to_string(),
            background: defaults::DEFAULT_BACKGROUND.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Preference store error: {0}")]
    Store(#[from] StoreError),

    #[error("Preference extraction failed: {0}")]
    Extraction(#[from] ProviderError),

    #[error("Unknown preference namespace: {0}")]
    UnknownNamespace(String),

    #[error("Namespace {namespace} is a {actual}, not a {expected}")]
    WrongShape {
        namespace: PreferenceNamespace,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Extraction output for a profile.
#[derive(Debug, Deserialize)]
struct ProfileRevision {
    preferences: String,
    #[serde(default)]
    justification: String,
}

/// Extraction output for a collection.
#[derive(Debug, Deserialize)]
struct CollectionRevision {
    #[serde(default)]
    add: Vec<String>,
    #[serde(default)]
    remove: Vec<String>,
    #[serde(default)]
    justification: String,
}

/// What an update did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSummary {
    ProfileReplaced,
    ProfileKept,
    CollectionChanged { added: usize, removed: usize },
}

/// Reads preferences with default seeding and revises them from reviewer feedback.
pub struct PreferenceManager {
    store: Arc<dyn DecisionStore>,
    extractor: Arc<dyn Provider>,
    model: String,
    defaults: PreferenceDefaults,
    fallback_on_read_error: bool,
    locks: [Mutex<()>; 4],
    event_bus: Option<Arc<EventBus>>,
}

impl PreferenceManager {
    pub fn new(
        store: Arc<dyn DecisionStore>,
        extractor: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            extractor,
            model: model.into(),
            defaults: PreferenceDefaults::default(),
            fallback_on_read_error: true,
            locks: Default::default(),
            event_bus: None,
        }
    }

    pub fn with_defaults(mut self, defaults: PreferenceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Whether a failed read returns the seed default instead of an error.
    pub fn with_read_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_read_error = enabled;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn defaults(&self) -> &PreferenceDefaults {
        &self.defaults
    }

    pub fn store(&self) -> &Arc<dyn DecisionStore> {
        &self.store
    }

    /// Read a namespace as text, whatever its shape.
    pub async fn read(&self, namespace: PreferenceNamespace) -> Result<String, PreferenceError> {
        match namespace.shape() {
            PreferenceShape::Profile => self.read_profile(namespace).await,
            PreferenceShape::Collection => self.read_collection(namespace).await,
        }
    }

    /// The stored profile, seeding the default if none exists.
    pub async fn read_profile(&self, namespace: PreferenceNamespace) -> Result<String, PreferenceError> {
        expect_shape(namespace, PreferenceShape::Profile)?;
        let default = self.defaults.get(namespace);
        match self.read_or_seed_profile(namespace, default).await {
            Ok(text) => Ok(text),
            Err(e) if self.fallback_on_read_error => {
                warn!(namespace = %namespace, error = %e, "Preference read failed, using default");
                Ok(default.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All collection entries joined in insertion order, seeding the default
    /// if the collection is empty.
    pub async fn read_collection(&self, namespace: PreferenceNamespace) -> Result<String, PreferenceError> {
        expect_shape(namespace, PreferenceShape::Collection)?;
        let default = self.defaults.get(namespace);
        match self.read_or_seed_collection(namespace, default).await {
            Ok(entries) => Ok(entries
                .into_iter()
                .map(|(_, text)| text)
                .collect::<Vec<_>>()
                .join(COLLECTION_SEPARATOR)),
            Err(e) if self.fallback_on_read_error => {
                warn!(namespace = %namespace, error = %e, "Preference read failed, using default");
                Ok(default.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revise a namespace from feedback, dispatching on its shape.
    pub async fn update(
        &self,
        namespace: PreferenceNamespace,
        feedback: &[Message],
    ) -> Result<UpdateSummary, PreferenceError> {
        match namespace.shape() {
            PreferenceShape::Profile => self.update_profile(namespace, feedback).await,
            PreferenceShape::Collection => self.update_collection(namespace, feedback).await,
        }
    }

    /// Replace a profile with the extractor's revision of it.
    pub async fn update_profile(
        &self,
        namespace: PreferenceNamespace,
        feedback: &[Message],
    ) -> Result<UpdateSummary, PreferenceError> {
        expect_shape(namespace, PreferenceShape::Profile)?;
        let _guard = self.locks[namespace.index()].lock().await;

        // Writes never fall back: an unreadable store fails the update.
        let current = self
            .load_or_seed_profile(namespace, self.defaults.get(namespace))
            .await?;

        let system = defaults::PROFILE_UPDATE_INSTRUCTIONS
            .replace("{namespace}", &namespace.namespace().path())
            .replace("{current_profile}", &current);
        let request = self.extraction_request(system, feedback, profile_schema());

        let response = self.extractor.complete(request).await?;
        let revision: ProfileRevision = response.parse_content()?;

        if revision.preferences.trim().is_empty() && !current.trim().is_empty() {
            warn!(namespace = %namespace, "Extractor returned an empty profile, keeping current one");
            return Ok(UpdateSummary::ProfileKept);
        }

        self.store
            .put(
                &namespace.namespace(),
                PROFILE_KEY,
                serde_json::Value::String(revision.preferences),
            )
            .await?;

        info!(
            namespace = %namespace,
            justification = %revision.justification,
            "Preference profile updated"
        );
        self.publish(namespace);
        Ok(UpdateSummary::ProfileReplaced)
    }

    /// Apply the extractor's additions and removals to a collection.
    pub async fn update_collection(
        &self,
        namespace: PreferenceNamespace,
        feedback: &[Message],
    ) -> Result<UpdateSummary, PreferenceError> {
        expect_shape(namespace, PreferenceShape::Collection)?;
        let _guard = self.locks[namespace.index()].lock().await;

        let entries = self
            .load_or_seed_collection(namespace, self.defaults.get(namespace))
            .await?;

        let listing = entries
            .iter()
            .map(|(key, text)| format!("[{key}] {text}"))
            .collect::<Vec<_>>()
            .join("\n");
        let system = defaults::COLLECTION_UPDATE_INSTRUCTIONS
            .replace("{namespace}", &namespace.namespace().path())
            .replace("{entries}", &listing);
        let request = self.extraction_request(system, feedback, collection_schema());

        let response = self.extractor.complete(request).await?;
        let revision: CollectionRevision = response.parse_content()?;

        let ns = namespace.namespace();
        let mut removed = 0;
        for key in &revision.remove {
            if self.store.delete(&ns, key).await? {
                removed += 1;
            } else {
                warn!(namespace = %namespace, key = %key, "Extractor asked to remove an unknown entry");
            }
        }

        let mut added = 0;
        for text in revision.add.iter().filter(|t| !t.trim().is_empty()) {
            let key = Uuid::new_v4().to_string();
            self.store
                .put(&ns, &key, serde_json::Value::String(text.clone()))
                .await?;
            added += 1;
        }

        info!(
            namespace = %namespace,
            added,
            removed,
            justification = %revision.justification,
            "Preference collection updated"
        );
        if added > 0 || removed > 0 {
            self.publish(namespace);
        }
        Ok(UpdateSummary::CollectionChanged { added, removed })
    }

    /// Delete everything in a namespace. The next read re-seeds the default.
    pub async fn reset(&self, namespace: PreferenceNamespace) -> Result<usize, PreferenceError> {
        let _guard = self.locks[namespace.index()].lock().await;
        let ns = namespace.namespace();
        let mut removed = 0;
        for item in self.store.search(&ns).await? {
            if self.store.delete(&ns, &item.key).await? {
                removed += 1;
            }
        }
        info!(namespace = %namespace, removed, "Preference namespace reset");
        Ok(removed)
    }

    /// Unlocked fast path for reads. A miss takes the namespace lock before
    /// seeding, so a concurrent update is never overwritten by the default.
    async fn read_or_seed_profile(
        &self,
        namespace: PreferenceNamespace,
        default: &str,
    ) -> Result<String, StoreError> {
        if let Some(item) = self.store.get(&namespace.namespace(), PROFILE_KEY).await? {
            return Ok(value_text(&item.value));
        }
        let _guard = self.locks[namespace.index()].lock().await;
        self.load_or_seed_profile(namespace, default).await
    }

    async fn read_or_seed_collection(
        &self,
        namespace: PreferenceNamespace,
        default: &str,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let items = self.store.search(&namespace.namespace()).await?;
        if !items.is_empty() {
            return Ok(entry_texts(items));
        }
        let _guard = self.locks[namespace.index()].lock().await;
        self.load_or_seed_collection(namespace, default).await
    }

    /// Caller must hold the namespace lock.
    async fn load_or_seed_profile(
        &self,
        namespace: PreferenceNamespace,
        default: &str,
    ) -> Result<String, StoreError> {
        let ns = namespace.namespace();
        if let Some(item) = self.store.get(&ns, PROFILE_KEY).await? {
            return Ok(value_text(&item.value));
        }
        debug!(namespace = %namespace, "Seeding default profile");
        self.store
            .put(&ns, PROFILE_KEY, serde_json::Value::String(default.to_string()))
            .await?;
        Ok(default.to_string())
    }

    /// Caller must hold the namespace lock.
    async fn load_or_seed_collection(
        &self,
        namespace: PreferenceNamespace,
        default: &str,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let ns = namespace.namespace();
        let items = self.store.search(&ns).await?;
        if !items.is_empty() {
            return Ok(entry_texts(items));
        }
        debug!(namespace = %namespace, "Seeding default collection entry");
        self.store
            .put(&ns, SEED_KEY, serde_json::Value::String(default.to_string()))
            .await?;
        Ok(vec![(SEED_KEY.to_string(), default.to_string())])
    }

    fn extraction_request(
        &self,
        system: String,
        feedback: &[Message],
        schema: ResponseFormat,
    ) -> ProviderRequest {
        let mut messages = Vec::with_capacity(feedback.len() + 2);
        messages.push(Message::system(system));
        messages.push(Message::user(defaults::UPDATE_USER_PROMPT));
        messages.extend(feedback.iter().cloned());

        let mut request = ProviderRequest::new(self.model.clone(), messages);
        request.temperature = 0.0;
        request.response_format = Some(schema);
        request
    }

    fn publish(&self, namespace: PreferenceNamespace) {
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::PreferenceUpdated {
                namespace: namespace.namespace().path(),
                timestamp: Utc::now(),
            });
        }
    }
}

fn expect_shape(namespace: PreferenceNamespace, expected: PreferenceShape) -> Result<(), PreferenceError> {
    let actual = namespace.shape();
    if actual == expected {
        return Ok(());
    }
    let label = |s: PreferenceShape| match s {
        PreferenceShape::Profile => "profile",
        PreferenceShape::Collection => "collection",
    };
    Err(PreferenceError::WrongShape {
        namespace,
        expected: label(expected),
        actual: label(actual),
    })
}

fn entry_texts(items: Vec<StoredItem>) -> Vec<(String, String)> {
    items
        .into_iter()
        .map(|item| {
            let text = value_text(&item.value);
            (item.key, text)
        })
        .collect()
}

/// Stored values are JSON strings; anything else is rendered as JSON text.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn profile_schema() -> ResponseFormat {
    ResponseFormat {
        name: "user_preferences".into(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "preferences": { "type": "string" },
                "justification": { "type": "string" }
            },
            "required": ["preferences", "justification"],
            "additionalProperties": false
        }),
    }
}

fn collection_schema() -> ResponseFormat {
    ResponseFormat {
        name: "collection_update".into(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "add": { "type": "array", "items": { "type": "string" } },
                "remove": { "type": "array", "items": { "type": "string" } },
                "justification": { "type": "string" }
            },
            "required": ["add", "remove", "justification"],
            "additionalProperties": false
        }),
    }
}
