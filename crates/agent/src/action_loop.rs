//! The action loop: decide, dispatch, repeat.
//!
//! 1. **Dispatch** every unanswered action from the last model turn, in the
//!    order proposed. Reviewable actions suspend the run; everything else
//!    executes immediately.
//! 2. **Decide**: call the model with the conversation and the action
//!    vocabulary. The system prompt is rebuilt from the current preferences
//!    on every call and is not stored in the conversation.
//! 3. The run ends when the model proposes only the terminal action, or
//!    proposes nothing at all (treated as done rather than stalling).
//!
//! `drive` is re-entrant: after a review outcome has been applied, calling
//! it again picks up with the next unanswered action.

use chrono::Local;
use mailgate_core::message::Message;
use mailgate_core::provider::{Provider, ProviderRequest};
use mailgate_core::run::{CompletionReason, Continuation, RunState};
use mailgate_memory::{PreferenceManager, PreferenceNamespace};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::actions::{ActionCatalog, ActionKind, MARK_DONE_ACK, MARK_DONE_NOT_ALONE};
use crate::error::AgentError;
use crate::gate::SuspensionGate;
use crate::prompts::{self, AgentContext};

/// How a call to [`ActionLoop::drive`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Waiting on a review outcome
    Suspended,
    Completed(CompletionReason),
}

pub struct ActionLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    catalog: Arc<ActionCatalog>,
    gate: Arc<SuspensionGate>,
    prefs: Arc<PreferenceManager>,
    /// Model calls allowed per run
    max_iterations: u32,
}

impl ActionLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        gate: Arc<SuspensionGate>,
        prefs: Arc<PreferenceManager>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            catalog: gate.catalog().clone(),
            gate,
            prefs,
            max_iterations: 25,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Advance the run until it suspends or completes.
    pub async fn drive(&self, state: &mut RunState) -> Result<LoopOutcome, AgentError> {
        loop {
            if self.dispatch_pending(state).await? {
                return Ok(LoopOutcome::Suspended);
            }

            if state.iterations >= self.max_iterations {
                warn!(
                    run_id = %state.id,
                    iterations = state.iterations,
                    "Max model iterations reached, ending run"
                );
                state.complete(CompletionReason::IterationLimit);
                return Ok(LoopOutcome::Completed(CompletionReason::IterationLimit));
            }

            state.iterations += 1;
            debug!(run_id = %state.id, iteration = state.iterations, "Action loop iteration");

            let request = self.build_request(state).await?;
            let response = self.provider.complete(request).await?;
            let turn = response.message;

            let kinds = turn
                .tool_calls
                .iter()
                .map(|tc| self.catalog.resolve(&tc.name))
                .collect::<Result<Vec<_>, _>>();
            let proposed = turn.tool_calls.len();
            let turn_id = turn.id.clone();
            // Kept even when invalid, for diagnostics.
            state.conversation.push(turn);
            let kinds = kinds?;

            if proposed == 0 {
                warn!(run_id = %state.id, "Model proposed no action, treating run as done");
                state.complete(CompletionReason::NoAction);
                return Ok(LoopOutcome::Completed(CompletionReason::NoAction));
            }

            if kinds.iter().all(ActionKind::is_terminal) {
                let call_ids: Vec<String> = state
                    .conversation
                    .last_assistant()
                    .map(|m| m.tool_calls.iter().map(|tc| tc.id.clone()).collect())
                    .unwrap_or_default();
                for id in call_ids {
                    state.conversation.push(Message::tool_result(id, MARK_DONE_ACK));
                }
                info!(run_id = %state.id, turn = %turn_id, "Model marked the run done");
                state.complete(CompletionReason::Done);
                return Ok(LoopOutcome::Completed(CompletionReason::Done));
            }

            debug!(run_id = %state.id, actions = proposed, "Dispatching proposed actions");
        }
    }

    /// Resolve unanswered actions of the last model turn. Returns `true`
    /// once the run has suspended on one of them.
    async fn dispatch_pending(&self, state: &mut RunState) -> Result<bool, AgentError> {
        let Some(turn) = state.conversation.last_assistant() else {
            return Ok(false);
        };
        let calls = turn.tool_calls.clone();
        let alongside_others = calls.len() > 1;

        for call in calls {
            if state.conversation.is_answered(&call.id) {
                continue;
            }
            let kind = self.catalog.resolve(&call.name)?;

            if kind.is_terminal() {
                let note = if alongside_others { MARK_DONE_NOT_ALONE } else { MARK_DONE_ACK };
                state.conversation.push(Message::tool_result(&call.id, note));
                continue;
            }

            if self.catalog.is_reviewable(&kind) {
                let request = self.gate.action_request(&state.message, &call, &kind);
                self.gate.suspend(
                    state,
                    Continuation::ActionReview {
                        call_id: call.id.clone(),
                    },
                    request,
                );
                return Ok(true);
            }

            let output = match call.parsed_arguments() {
                Ok(args) => self.catalog.execute(&call.id, &call.name, args).await,
                Err(e) => format!("Error: invalid arguments for {}: {e}", call.name),
            };
            state.conversation.push(Message::tool_result(&call.id, output));
        }
        Ok(false)
    }

    async fn build_request(&self, state: &RunState) -> Result<ProviderRequest, AgentError> {
        let response_preferences = self.prefs.read(PreferenceNamespace::ResponseStyle).await?;
        let cal_preferences = self.prefs.read(PreferenceNamespace::Calendar).await?;
        let background = self.prefs.read(PreferenceNamespace::Background).await?;
        let tools = self.catalog.definitions();

        let system = prompts::agent_system_prompt(&AgentContext {
            tools: &tools,
            response_preferences: &response_preferences,
            cal_preferences: &cal_preferences,
            background: &background,
            today: Local::now().date_naive(),
        });

        let mut messages = Vec::with_capacity(state.conversation.len() + 1);
        messages.push(Message::system(system));
        messages.extend(state.conversation.messages.iter().cloned());

        let mut request = ProviderRequest::new(self.model.clone(), messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request.tools = tools;
        request.require_tool_call = true;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use mailgate_core::inbound::InboundMessage;
    use mailgate_core::message::Role;
    use mailgate_core::review::ReviewOutcome;
    use mailgate_core::store::DecisionStore;
    use serde_json::json;

    fn respond_state() -> RunState {
        let mut state = RunState::new(InboundMessage::new(
            "alice@example.com",
            "me@example.com",
            "Sync",
            "Can we meet Tuesday?",
        ));
        state.conversation.push(Message::user("Respond to the email"));
        state
    }

    fn action_loop(h: &Harness, provider: Arc<SequentialMockProvider>) -> ActionLoop {
        ActionLoop::new(provider, "mock-model", h.gate.clone(), h.prefs.clone())
    }

    #[tokio::test]
    async fn low_risk_actions_run_without_review() {
        let h = Harness::new();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_tool_call("check_availability", json!({"day": "Tuesday"}))]),
            make_tool_call_response(vec![make_tool_call("mark_done", json!({"done": true}))]),
        ]));
        let mut state = respond_state();

        let outcome = action_loop(&h, provider.clone()).drive(&mut state).await.unwrap();

        assert_eq!(outcome, LoopOutcome::Completed(CompletionReason::Done));
        assert_eq!(h.availability.calls(), 1);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(state.iterations, 2);

        let second = provider.request(1);
        assert_eq!(second.messages[0].role, Role::System);
        assert!(second.require_tool_call);
        assert!(second.messages.iter().any(|m| m.content == "check_availability done"));
    }

    #[tokio::test]
    async fn reviewable_action_suspends_then_resumes() {
        let h = Harness::new();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_tool_call("send_message", email_args())]),
            make_tool_call_response(vec![make_tool_call("mark_done", json!({"done": true}))]),
        ]));
        let runner = action_loop(&h, provider.clone());
        let mut state = respond_state();

        assert_eq!(runner.drive(&mut state).await.unwrap(), LoopOutcome::Suspended);
        assert_eq!(h.send.calls(), 0);
        let request = state.pending_review().unwrap().clone();
        assert_eq!(request.action_request.action, "send_message");

        let (continuation, request) = state.take_pending().unwrap();
        h.gate
            .resolve(&mut state, continuation, &request, ReviewOutcome::Accept)
            .await
            .unwrap();
        assert_eq!(
            runner.drive(&mut state).await.unwrap(),
            LoopOutcome::Completed(CompletionReason::Done)
        );
        assert_eq!(h.send.calls(), 1);
    }

    #[tokio::test]
    async fn multiple_actions_resolve_in_proposed_order() {
        let h = Harness::new();
        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(vec![
            make_tool_call_with_id("c1", "check_availability", json!({"day": "Tuesday"})),
            make_tool_call_with_id("c2", "send_message", email_args()),
        ])]));
        let mut state = respond_state();

        let outcome = action_loop(&h, provider).drive(&mut state).await.unwrap();
        assert_eq!(outcome, LoopOutcome::Suspended);

        let results: Vec<_> = state
            .conversation
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(results, vec!["c1"]);
        assert!(matches!(
            state.gate,
            mailgate_core::run::GateState::Awaiting { continuation: Continuation::ActionReview { ref call_id }, .. } if call_id == "c2"
        ));
    }

    #[tokio::test]
    async fn no_action_ends_the_run() {
        let h = Harness::new();
        let provider = Arc::new(SequentialMockProvider::single_text("All set."));
        let mut state = respond_state();

        let outcome = action_loop(&h, provider).drive(&mut state).await.unwrap();
        assert_eq!(outcome, LoopOutcome::Completed(CompletionReason::NoAction));
        assert_eq!(state.conversation.last_assistant().unwrap().content, "All set.");
    }

    #[tokio::test]
    async fn unknown_action_is_fatal() {
        let h = Harness::new();
        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(vec![
            make_tool_call("delete_inbox", json!({})),
        ])]));
        let mut state = respond_state();

        let err = action_loop(&h, provider).drive(&mut state).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownAction(ref name) if name == "delete_inbox"));
        assert_eq!(state.conversation.len(), 2);
    }

    #[tokio::test]
    async fn mark_done_alongside_other_actions_keeps_going() {
        let h = Harness::new();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![
                make_tool_call("check_availability", json!({"day": "Tuesday"})),
                make_tool_call("mark_done", json!({"done": true})),
            ]),
            make_tool_call_response(vec![make_tool_call("mark_done", json!({"done": true}))]),
        ]));
        let mut state = respond_state();

        let outcome = action_loop(&h, provider.clone()).drive(&mut state).await.unwrap();
        assert_eq!(outcome, LoopOutcome::Completed(CompletionReason::Done));
        assert_eq!(provider.call_count(), 2);
        assert!(state
            .conversation
            .messages
            .iter()
            .any(|m| m.content == MARK_DONE_NOT_ALONE));
    }

    #[tokio::test]
    async fn iteration_limit_completes_the_run() {
        let h = Harness::new();
        let availability = || {
            make_tool_call_response(vec![make_tool_call("check_availability", json!({"day": "Tuesday"}))])
        };
        let provider = Arc::new(SequentialMockProvider::new(vec![availability(), availability()]));
        let mut state = respond_state();

        let outcome = action_loop(&h, provider.clone())
            .with_max_iterations(2)
            .drive(&mut state)
            .await
            .unwrap();
        assert_eq!(outcome, LoopOutcome::Completed(CompletionReason::IterationLimit));
        assert_eq!(provider.call_count(), 2);
        assert_eq!(h.availability.calls(), 2);
    }

    #[tokio::test]
    async fn system_prompt_reflects_current_preferences() {
        let h = Harness::new();
        h.store
            .put(
                &PreferenceNamespace::ResponseStyle.namespace(),
                mailgate_memory::preferences::PROFILE_KEY,
                json!("Always reply in French"),
            )
            .await
            .unwrap();
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let mut state = respond_state();

        action_loop(&h, provider.clone()).drive(&mut state).await.unwrap();
        let request = provider.request(0);
        assert!(request.messages[0].content.contains("Always reply in French"));
        assert!(request.tools.iter().any(|t| t.name == "ask_question"));
        assert!(!state.conversation.messages.iter().any(|m| m.role == Role::System));
    }
}
