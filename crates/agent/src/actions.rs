//! The action vocabulary and its dispatch policy.
//!
//! Every name the model may propose resolves to an [`ActionKind`]. The kind
//! fixes the review permissions, which preference namespace learns from a
//! reviewer's answer, and what the model is told when an action is skipped.
//! [`ActionCatalog`] pairs the vocabulary with the executable tool registry
//! and the configured set of reviewable actions.

use chrono::Utc;
use mailgate_core::event::{DomainEvent, EventBus};
use mailgate_core::provider::ToolDefinition;
use mailgate_core::review::ReviewPermissions;
use mailgate_core::tool::{ToolCall, ToolRegistry};
use mailgate_memory::PreferenceNamespace;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AgentError;

pub const SEND_MESSAGE: &str = "send_message";
pub const SCHEDULE_EVENT: &str = "schedule_event";
pub const CHECK_AVAILABILITY: &str = "check_availability";
pub const ASK_QUESTION: &str = "ask_question";
pub const MARK_DONE: &str = "mark_done";

/// Actions that go through review unless configured otherwise.
pub const DEFAULT_REVIEWABLE: [&str; 3] = [SEND_MESSAGE, SCHEDULE_EVENT, ASK_QUESTION];

/// A resolved action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    SendMessage,
    ScheduleEvent,
    CheckAvailability,
    AskQuestion,
    /// The terminal action
    MarkDone,
    /// A registered tool outside the built-in vocabulary
    Extension(String),
}

impl ActionKind {
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            SEND_MESSAGE => Some(ActionKind::SendMessage),
            SCHEDULE_EVENT => Some(ActionKind::ScheduleEvent),
            CHECK_AVAILABILITY => Some(ActionKind::CheckAvailability),
            ASK_QUESTION => Some(ActionKind::AskQuestion),
            MARK_DONE => Some(ActionKind::MarkDone),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ActionKind::SendMessage => SEND_MESSAGE,
            ActionKind::ScheduleEvent => SCHEDULE_EVENT,
            ActionKind::CheckAvailability => CHECK_AVAILABILITY,
            ActionKind::AskQuestion => ASK_QUESTION,
            ActionKind::MarkDone => MARK_DONE,
            ActionKind::Extension(name) => name,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionKind::MarkDone)
    }

    /// A question has nothing to execute, so it can only be answered or dropped.
    pub fn permissions(&self) -> ReviewPermissions {
        match self {
            ActionKind::AskQuestion => ReviewPermissions::ANSWER_ONLY,
            _ => ReviewPermissions::ALL,
        }
    }

    /// Namespace revised when the reviewer edits this action's arguments.
    pub fn edit_namespace(&self) -> Option<PreferenceNamespace> {
        match self {
            ActionKind::SendMessage => Some(PreferenceNamespace::ResponseStyle),
            ActionKind::ScheduleEvent => Some(PreferenceNamespace::Calendar),
            _ => None,
        }
    }

    /// Namespace revised when the reviewer answers with feedback.
    pub fn respond_namespace(&self) -> Option<PreferenceNamespace> {
        match self {
            ActionKind::AskQuestion => Some(PreferenceNamespace::Background),
            other => other.edit_namespace(),
        }
    }

    /// Whether ignoring this action means the message should never have
    /// been routed to `respond`.
    pub fn ignore_updates_triage(&self) -> bool {
        matches!(self, ActionKind::SendMessage | ActionKind::ScheduleEvent)
    }

    /// Tool-result text appended when the reviewer ignores this action.
    pub fn ignore_message(&self) -> String {
        match self {
            ActionKind::SendMessage => format!(
                "User ignored this email draft. Ignore this email and end the workflow: treat it as handled and call {MARK_DONE}."
            ),
            ActionKind::ScheduleEvent => {
                "User ignored this calendar meeting draft. Do not schedule a meeting; respond to the email without scheduling.".to_string()
            }
            ActionKind::AskQuestion => {
                "User ignored this question. Proceed with the task using the information you already have, without asking further questions.".to_string()
            }
            other => format!(
                "User ignored this {} call. Continue without it.",
                other.name()
            ),
        }
    }

    /// Tool-result text appended when the reviewer answers with feedback.
    pub fn respond_message(&self, feedback: &str) -> String {
        match self {
            ActionKind::SendMessage => format!(
                "User gave feedback, which we can incorporate into the email. Feedback: {feedback}"
            ),
            ActionKind::ScheduleEvent => format!(
                "User gave feedback, which we can incorporate into the meeting request. Feedback: {feedback}"
            ),
            ActionKind::AskQuestion => format!(
                "User answered the question, which we can use for any follow up actions. Feedback: {feedback}"
            ),
            other => format!(
                "User gave feedback instead of running {}. Feedback: {feedback}",
                other.name()
            ),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Appended for a terminal action proposed alongside other actions.
pub const MARK_DONE_NOT_ALONE: &str =
    "mark_done was proposed together with other actions. Call mark_done on its own when finished.";

/// Appended for a terminal action that ends the run.
pub const MARK_DONE_ACK: &str = "Task marked complete.";

/// Appended when the reviewer aborts the run.
pub const ABORTED: &str = "Reviewer aborted the run.";

/// The action vocabulary plus the executors behind it.
pub struct ActionCatalog {
    tools: Arc<ToolRegistry>,
    reviewable: BTreeSet<String>,
    event_bus: Option<Arc<EventBus>>,
}

impl ActionCatalog {
    /// A catalog reviewing the default action set.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            reviewable: DEFAULT_REVIEWABLE.iter().map(|s| s.to_string()).collect(),
            event_bus: None,
        }
    }

    /// Replace the reviewable set. The terminal action is never reviewable.
    pub fn with_reviewable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reviewable = names
            .into_iter()
            .map(Into::into)
            .filter(|name| name != MARK_DONE)
            .collect();
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Resolve a proposed name. Names that are neither built in nor
    /// registered are a collaborator error.
    pub fn resolve(&self, name: &str) -> Result<ActionKind, AgentError> {
        if let Some(kind) = ActionKind::builtin(name) {
            return Ok(kind);
        }
        if self.tools.contains(name) {
            return Ok(ActionKind::Extension(name.to_string()));
        }
        Err(AgentError::UnknownAction(name.to_string()))
    }

    pub fn is_reviewable(&self, kind: &ActionKind) -> bool {
        !kind.is_terminal() && self.reviewable.contains(kind.name())
    }

    /// Registered tools, then the question and terminal pseudo-actions.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = self.tools.definitions();
        defs.push(ToolDefinition {
            name: ASK_QUESTION.into(),
            description: "Ask the user a follow-up question when the background, response or calendar preferences are not enough to proceed.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string", "description": "The question to ask" }
                },
                "required": ["content"]
            }),
        });
        defs.push(ToolDefinition {
            name: MARK_DONE.into(),
            description: "Signal that the email has been fully handled. Call it on its own.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "done": { "type": "boolean" }
                },
                "required": ["done"]
            }),
        });
        defs
    }

    /// Run one action and return the tool-result text.
    ///
    /// Failures come back as an `Error: ...` result so the model can react;
    /// nothing here is fatal to a run.
    pub async fn execute(&self, call_id: &str, name: &str, arguments: serde_json::Value) -> String {
        let call = ToolCall {
            id: call_id.to_string(),
            name: name.to_string(),
            arguments,
        };

        let start = std::time::Instant::now();
        let result = self.tools.execute(&call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, output) = match result {
            Ok(result) => {
                debug!(tool = %name, call_id = %call_id, duration_ms, "Tool executed");
                (result.success, result.output)
            }
            Err(e) => {
                warn!(tool = %name, call_id = %call_id, error = %e, "Tool execution failed");
                (false, format!("Error: {e}"))
            }
        };

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ToolExecuted {
                tool_name: name.to_string(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }
        output
    }
}
