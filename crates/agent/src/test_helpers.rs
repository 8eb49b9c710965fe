//! Shared test doubles for the agent unit tests.

use async_trait::async_trait;
use mailgate_core::error::{ProviderError, ToolError};
use mailgate_core::message::{Message, MessageToolCall};
use mailgate_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use mailgate_core::tool::{Tool, ToolRegistry, ToolResult};
use mailgate_core::{DecisionStore, EventBus};
use mailgate_memory::{InMemoryStore, PreferenceManager};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::actions::ActionCatalog;
use crate::gate::SuspensionGate;

/// A mock provider that returns a sequence of scripted responses and keeps
/// every request it saw.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                responses.len()
            );
        }
        requests.push(request);
        responses[index].clone()
    }
}

/// Answers every extraction request with a fixed revision and records the
/// system prompt of each, so tests can count updates per namespace.
pub struct RecordingExtractor {
    systems: Mutex<Vec<String>>,
}

impl RecordingExtractor {
    pub fn new() -> Self {
        Self {
            systems: Mutex::new(Vec::new()),
        }
    }

    pub fn total(&self) -> usize {
        self.systems.lock().unwrap().len()
    }

    /// Update calls whose target namespace path is `path`.
    pub fn updates_for(&self, path: &str) -> usize {
        let needle = format!("for {path}\n");
        self.systems
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.contains(&needle))
            .count()
    }
}

#[async_trait]
impl Provider for RecordingExtractor {
    fn name(&self) -> &str {
        "recording_extractor"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let system = request
            .messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.systems.lock().unwrap().push(system);

        let schema = request.response_format.map(|f| f.name).unwrap_or_default();
        let body = if schema == "collection_update" {
            serde_json::json!({"add": ["Learned from feedback"], "remove": [], "justification": "test"})
        } else {
            serde_json::json!({"preferences": "Revised preferences", "justification": "test"})
        };
        Ok(make_text_response(&body.to_string()))
    }
}

/// A tool that counts its invocations and keeps the last arguments.
pub struct CountingTool {
    name: String,
    calls: Arc<AtomicUsize>,
    last_args: Arc<Mutex<Option<serde_json::Value>>>,
}

impl CountingTool {
    pub fn new(name: &str) -> (Self, ToolLedger) {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_args = Arc::new(Mutex::new(None));
        let ledger = ToolLedger {
            calls: calls.clone(),
            last_args: last_args.clone(),
        };
        (
            Self {
                name: name.to_string(),
                calls,
                last_args,
            },
            ledger,
        )
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Counting test tool"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock().unwrap() = Some(arguments);
        Ok(ToolResult::ok(format!("{} done", self.name)))
    }
}

/// Read side of a [`CountingTool`].
#[derive(Clone)]
pub struct ToolLedger {
    calls: Arc<AtomicUsize>,
    last_args: Arc<Mutex<Option<serde_json::Value>>>,
}

impl ToolLedger {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_args(&self) -> Option<serde_json::Value> {
        self.last_args.lock().unwrap().clone()
    }
}

/// Counting doubles for the three built-in tools plus the wiring around them.
pub struct Harness {
    pub store: Arc<dyn DecisionStore>,
    pub extractor: Arc<RecordingExtractor>,
    pub prefs: Arc<PreferenceManager>,
    pub catalog: Arc<ActionCatalog>,
    pub gate: Arc<SuspensionGate>,
    pub event_bus: Arc<EventBus>,
    pub send: ToolLedger,
    pub schedule: ToolLedger,
    pub availability: ToolLedger,
}

impl Harness {
    pub fn new() -> Self {
        let store: Arc<dyn DecisionStore> = Arc::new(InMemoryStore::new());
        let extractor = Arc::new(RecordingExtractor::new());
        let event_bus = Arc::new(EventBus::default());

        let mut registry = ToolRegistry::new();
        let (send_tool, send) = CountingTool::new("send_message");
        let (schedule_tool, schedule) = CountingTool::new("schedule_event");
        let (availability_tool, availability) = CountingTool::new("check_availability");
        registry.register(Box::new(send_tool));
        registry.register(Box::new(schedule_tool));
        registry.register(Box::new(availability_tool));

        let prefs = Arc::new(PreferenceManager::new(store.clone(), extractor.clone(), "extract-model"));
        let catalog = Arc::new(ActionCatalog::new(Arc::new(registry)).with_event_bus(event_bus.clone()));
        let gate = Arc::new(
            SuspensionGate::new(catalog.clone(), prefs.clone()).with_event_bus(event_bus.clone()),
        );

        Self {
            store,
            extractor,
            prefs,
            catalog,
            gate,
            event_bus,
            send,
            schedule,
            availability,
        }
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A tool call with id `call_<name>`.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    make_tool_call_with_id(&format!("call_{name}"), name, args)
}

pub fn make_tool_call_with_id(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

pub fn router_response(classification: &str, reasoning: &str) -> ProviderResponse {
    make_text_response(
        &serde_json::json!({"reasoning": reasoning, "classification": classification}).to_string(),
    )
}

pub fn email_args() -> serde_json::Value {
    serde_json::json!({
        "to": "alice@example.com",
        "subject": "Re: Sync",
        "content": "Tuesday at 2pm works for me."
    })
}
