//! Suspension gate: builds review requests and applies review outcomes.
//!
//! The gate never blocks. Suspending writes the request into the run's
//! gate state and hands control back; resolving is a separate call made
//! with exactly one outcome once the reviewer has answered.
//!
//! | outcome  | executes            | tool result        | preference update          |
//! |----------|---------------------|--------------------|----------------------------|
//! | accept   | original arguments  | real               | none                       |
//! | edit     | edited arguments    | real               | edit namespace             |
//! | ignore   | nothing             | synthetic          | triage (drafts only)       |
//! | response | nothing             | synthetic          | respond namespace          |
//! | abort    | nothing             | synthetic          | none                       |

use chrono::Utc;
use mailgate_core::error::ProtocolError;
use mailgate_core::event::{DomainEvent, EventBus};
use mailgate_core::inbound::InboundMessage;
use mailgate_core::message::{Message, MessageToolCall};
use mailgate_core::review::{ActionRequest, ReviewOutcome, ReviewPermissions, ReviewRequest};
use mailgate_core::run::{CompletionReason, Continuation, RunState};
use mailgate_memory::{PreferenceManager, PreferenceNamespace};
use std::sync::Arc;
use tracing::{info, warn};

use crate::actions::{ABORTED, ActionCatalog, ActionKind};
use crate::error::AgentError;
use crate::{prompts, render};

/// Action label used for a pure triage review.
pub const TRIAGE_ACTION: &str = "Email Assistant: notify";

/// What the run does after an outcome has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Back to the action loop
    Continue,
    /// The run is over
    Finished(CompletionReason),
}

pub struct SuspensionGate {
    catalog: Arc<ActionCatalog>,
    prefs: Arc<PreferenceManager>,
    event_bus: Option<Arc<EventBus>>,
}

impl SuspensionGate {
    pub fn new(catalog: Arc<ActionCatalog>, prefs: Arc<PreferenceManager>) -> Self {
        Self {
            catalog,
            prefs,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn catalog(&self) -> &Arc<ActionCatalog> {
        &self.catalog
    }

    /// Review request for a message classified `notify`.
    pub fn triage_request(&self, message: &InboundMessage) -> ReviewRequest {
        ReviewRequest {
            action_request: ActionRequest {
                action: TRIAGE_ACTION.into(),
                args: serde_json::json!({}),
            },
            permissions: ReviewPermissions::TRIAGE,
            description: render::email_markdown(message),
        }
    }

    /// Review request for one proposed action.
    pub fn action_request(
        &self,
        message: &InboundMessage,
        call: &MessageToolCall,
        kind: &ActionKind,
    ) -> ReviewRequest {
        let args = reviewable_args(call);
        ReviewRequest {
            description: render::review_description(message, kind.name(), &args),
            action_request: ActionRequest {
                action: kind.name().to_string(),
                args,
            },
            permissions: kind.permissions(),
        }
    }

    /// Put the run into the awaiting state.
    pub fn suspend(&self, state: &mut RunState, continuation: Continuation, request: ReviewRequest) {
        info!(
            run_id = %state.id,
            action = %request.action_request.action,
            "Run suspended for review"
        );
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ReviewRequested {
                run_id: state.id.to_string(),
                action: request.action_request.action.clone(),
                timestamp: Utc::now(),
            });
        }
        state.suspend(continuation, request);
    }

    /// Apply one outcome to the request it answers.
    ///
    /// An outcome the request does not permit is a protocol error and
    /// nothing is applied.
    pub async fn resolve(
        &self,
        state: &mut RunState,
        continuation: Continuation,
        request: &ReviewRequest,
        outcome: ReviewOutcome,
    ) -> Result<Resolution, AgentError> {
        let action = request.action_request.action.clone();
        if !request.permissions.permits(&outcome) {
            return Err(ProtocolError::OutcomeNotPermitted {
                action,
                outcome: outcome.tag().to_string(),
            }
            .into());
        }

        let tag = outcome.tag();
        info!(run_id = %state.id, action = %action, outcome = tag, "Applying review outcome");

        let resolution = match continuation {
            Continuation::TriageReview => self.resolve_triage(state, outcome).await?,
            Continuation::ActionReview { call_id } => {
                self.resolve_action(state, &call_id, outcome).await?
            }
        };

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ReviewResolved {
                run_id: state.id.to_string(),
                action,
                outcome: tag.to_string(),
                timestamp: Utc::now(),
            });
        }
        Ok(resolution)
    }

    async fn resolve_triage(
        &self,
        state: &mut RunState,
        outcome: ReviewOutcome,
    ) -> Result<Resolution, AgentError> {
        let note = match outcome {
            ReviewOutcome::Accept => return Ok(Resolution::Finished(CompletionReason::Notified)),
            ReviewOutcome::Abort => return Ok(Resolution::Finished(CompletionReason::Aborted)),
            ReviewOutcome::Respond(feedback) => prompts::triage_respond_feedback(&feedback),
            ReviewOutcome::Ignore => prompts::triage_ignore_feedback(),
            ReviewOutcome::Edit(_) => {
                return Err(ProtocolError::OutcomeNotPermitted {
                    action: TRIAGE_ACTION.into(),
                    outcome: "edit".into(),
                }
                .into());
            }
        };

        let feedback = [
            Message::user(render::email_markdown(&state.message)),
            Message::user(note),
        ];
        self.prefs.update(PreferenceNamespace::Triage, &feedback).await?;
        Ok(Resolution::Finished(CompletionReason::Notified))
    }

    async fn resolve_action(
        &self,
        state: &mut RunState,
        call_id: &str,
        outcome: ReviewOutcome,
    ) -> Result<Resolution, AgentError> {
        let stale = || ProtocolError::StaleAction {
            call_id: call_id.to_string(),
        };
        if state.conversation.is_answered(call_id) {
            return Err(stale().into());
        }
        let call = state
            .conversation
            .last_assistant()
            .and_then(|turn| turn.tool_calls.iter().find(|tc| tc.id == call_id))
            .cloned()
            .ok_or_else(stale)?;
        let kind = self.catalog.resolve(&call.name)?;

        match outcome {
            ReviewOutcome::Accept => {
                let output = match call.parsed_arguments() {
                    Ok(args) => self.catalog.execute(call_id, &call.name, args).await,
                    Err(e) => format!("Error: invalid arguments for {}: {e}", call.name),
                };
                state.conversation.push(Message::tool_result(call_id, output));
            }
            ReviewOutcome::Edit(value) => {
                let edited = unwrap_edit_args(value);
                let original = reviewable_args(&call);

                if !state
                    .conversation
                    .replace_tool_call_arguments(call_id, edited.to_string())
                {
                    return Err(stale().into());
                }
                let output = self.catalog.execute(call_id, &call.name, edited.clone()).await;
                state.conversation.push(Message::tool_result(call_id, output));

                if let Some(namespace) = kind.edit_namespace() {
                    let feedback = [Message::user(prompts::edit_feedback(&kind, &original, &edited))];
                    self.prefs.update(namespace, &feedback).await?;
                }
            }
            ReviewOutcome::Ignore => {
                let transcript = render::transcript(&state.conversation);
                state
                    .conversation
                    .push(Message::tool_result(call_id, kind.ignore_message()));

                if kind.ignore_updates_triage() {
                    let feedback = [
                        Message::user(transcript),
                        Message::user(prompts::ignore_triage_feedback(&kind)),
                    ];
                    self.prefs.update(PreferenceNamespace::Triage, &feedback).await?;
                }
            }
            ReviewOutcome::Respond(text) => {
                let transcript = render::transcript(&state.conversation);
                state
                    .conversation
                    .push(Message::tool_result(call_id, kind.respond_message(&text)));

                match kind.respond_namespace() {
                    Some(namespace) => {
                        let feedback = [
                            Message::user(transcript),
                            Message::user(prompts::respond_feedback(&kind, &text)),
                        ];
                        self.prefs.update(namespace, &feedback).await?;
                    }
                    None => warn!(action = %kind, "No preference namespace learns from this action"),
                }
            }
            ReviewOutcome::Abort => {
                state.conversation.push(Message::tool_result(call_id, ABORTED));
                return Ok(Resolution::Finished(CompletionReason::Aborted));
            }
        }
        Ok(Resolution::Continue)
    }
}

/// Proposed arguments as JSON, or the raw text when the model sent something
/// unparsable. The reviewer still sees exactly what was proposed.
fn reviewable_args(call: &MessageToolCall) -> serde_json::Value {
    match call.parsed_arguments() {
        Ok(args) => args,
        Err(e) => {
            warn!(
                call_id = %call.id,
                action = %call.name,
                error = %e,
                "Proposed arguments are not valid JSON, showing raw text"
            );
            serde_json::Value::String(call.arguments.clone())
        }
    }
}

/// Reviewers may send either the bare argument record or `{"args": {...}}`.
fn unwrap_edit_args(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) if map.len() == 1 && map.get("args").is_some_and(|v| v.is_object()) => {
            map.remove("args").unwrap_or_default()
        }
        other => other,
    }
}
