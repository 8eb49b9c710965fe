//! Durable run state.
//!
//! A run is a sequential state machine over one inbound message. Everything
//! needed to resume after an arbitrarily long suspension lives in
//! [`RunState`]; resumption is a fresh call that reloads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::inbound::{Disposition, InboundMessage};
use crate::message::Conversation;
use crate::review::ReviewRequest;

/// Unique identifier for a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Suspended,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Where execution paused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Continuation {
    /// The classifier routed a `notify` message to the reviewer
    TriageReview,
    /// A reviewable action proposed in the last assistant turn
    ActionReview { call_id: String },
}

/// Suspension gate state persisted with the run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// No outstanding review request
    #[default]
    Idle,
    /// Exactly one review request outstanding
    Awaiting {
        continuation: Continuation,
        request: ReviewRequest,
    },
}

/// Why a run completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Classified `ignore`
    Ignored,
    /// Classified `notify` and the reviewer answered the triage review
    Notified,
    /// The model proposed the terminal action
    Done,
    /// The model proposed no action at all
    NoAction,
    /// The reviewer aborted the run
    Aborted,
    /// The model-call budget for the run was exhausted
    IterationLimit,
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompletionReason::Ignored => "ignored",
            CompletionReason::Notified => "notified",
            CompletionReason::Done => "done",
            CompletionReason::NoAction => "no_action",
            CompletionReason::Aborted => "aborted",
            CompletionReason::IterationLimit => "iteration_limit",
        };
        f.write_str(s)
    }
}

/// The durable snapshot of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub id: RunId,

    /// The message being handled; never modified once accepted
    pub message: InboundMessage,

    /// Set once by the classifier, before any action-loop iteration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,

    /// Classifier reasoning, kept for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    pub conversation: Conversation,

    #[serde(default)]
    pub gate: GateState,

    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionReason>,

    /// Model calls made by the action loop so far
    #[serde(default)]
    pub iterations: u32,

    /// Failure description for failed runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// A fresh run for `message`.
    pub fn new(message: InboundMessage) -> Self {
        let now = Utc::now();
        Self {
            id: RunId::new(),
            message,
            disposition: None,
            reasoning: None,
            conversation: Conversation::new(),
            gate: GateState::Idle,
            status: RunStatus::Running,
            completion: None,
            iterations: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.gate, GateState::Awaiting { .. })
    }

    /// The outstanding review request, if any.
    pub fn pending_review(&self) -> Option<&ReviewRequest> {
        match &self.gate {
            GateState::Awaiting { request, .. } => Some(request),
            GateState::Idle => None,
        }
    }

    /// Enter the `awaiting` gate state.
    pub fn suspend(&mut self, continuation: Continuation, request: ReviewRequest) {
        self.gate = GateState::Awaiting { continuation, request };
        self.status = RunStatus::Suspended;
        self.touch();
    }

    /// Leave the `awaiting` gate state, returning what was pending.
    pub fn take_pending(&mut self) -> Option<(Continuation, ReviewRequest)> {
        match std::mem::take(&mut self.gate) {
            GateState::Awaiting { continuation, request } => {
                self.status = RunStatus::Running;
                self.touch();
                Some((continuation, request))
            }
            GateState::Idle => None,
        }
    }

    pub fn complete(&mut self, reason: CompletionReason) {
        self.gate = GateState::Idle;
        self.status = RunStatus::Completed;
        self.completion = Some(reason);
        self.touch();
    }

    /// Mark the run failed. The conversation is retained for diagnostics.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.gate = GateState::Idle;
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
