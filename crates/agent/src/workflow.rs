//! Workflow controller: classifier, triage review and action loop composed
//! into one resumable run.
//!
//! Every transition is persisted before control returns to the caller, so a
//! suspended run can be resumed from a fresh process with nothing but its id
//! and one review outcome.

use chrono::Utc;
use mailgate_core::error::ProtocolError;
use mailgate_core::event::{DomainEvent, EventBus};
use mailgate_core::inbound::{Disposition, InboundMessage};
use mailgate_core::message::Message;
use mailgate_core::review::{ReviewOutcome, ReviewRequest};
use mailgate_core::run::{CompletionReason, Continuation, RunId, RunState};
use mailgate_memory::{PreferenceManager, PreferenceNamespace, RunRepository};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::action_loop::{ActionLoop, LoopOutcome};
use crate::classifier::Classifier;
use crate::error::{AgentError, RunError};
use crate::gate::{Resolution, SuspensionGate};
use crate::prompts;

/// Where a run stands when `start` or `resume` returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Waiting on the reviewer
    Suspended { run_id: RunId, request: ReviewRequest },
    Completed {
        run_id: RunId,
        disposition: Option<Disposition>,
        reason: CompletionReason,
    },
}

impl RunOutcome {
    pub fn run_id(&self) -> &RunId {
        match self {
            RunOutcome::Suspended { run_id, .. } | RunOutcome::Completed { run_id, .. } => run_id,
        }
    }
}

pub struct WorkflowController {
    classifier: Classifier,
    action_loop: ActionLoop,
    gate: Arc<SuspensionGate>,
    prefs: Arc<PreferenceManager>,
    runs: RunRepository,
    event_bus: Option<Arc<EventBus>>,
}

impl WorkflowController {
    pub fn new(
        classifier: Classifier,
        action_loop: ActionLoop,
        gate: Arc<SuspensionGate>,
        prefs: Arc<PreferenceManager>,
        runs: RunRepository,
    ) -> Self {
        Self {
            classifier,
            action_loop,
            gate,
            prefs,
            runs,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Start a run for `message`.
    pub async fn start(&self, message: InboundMessage) -> Result<RunOutcome, RunError> {
        let mut state = RunState::new(message);
        info!(run_id = %state.id, subject = %state.message.subject, "Run started");

        let result = self.start_inner(&mut state).await;
        self.settle(state, result).await
    }

    async fn start_inner(&self, state: &mut RunState) -> Result<(), AgentError> {
        self.runs.save(state).await?;

        let triage_rules = self.prefs.read(PreferenceNamespace::Triage).await?;
        let background = self.prefs.read(PreferenceNamespace::Background).await?;
        let verdict = self
            .classifier
            .classify(&state.message, &triage_rules, &background)
            .await?;

        state.disposition = Some(verdict.disposition);
        state.reasoning = Some(verdict.reasoning);
        self.publish(DomainEvent::MessageClassified {
            run_id: state.id.to_string(),
            disposition: verdict.disposition.to_string(),
            timestamp: Utc::now(),
        });

        match verdict.disposition {
            Disposition::Ignore => {
                state.complete(CompletionReason::Ignored);
            }
            Disposition::Notify => {
                let request = self.gate.triage_request(&state.message);
                self.gate.suspend(state, Continuation::TriageReview, request);
            }
            Disposition::Respond => {
                state
                    .conversation
                    .push(Message::user(prompts::respond_instruction(&state.message)));
                self.action_loop.drive(state).await?;
            }
        }
        Ok(())
    }

    /// Resume a suspended run with exactly one review outcome.
    pub async fn resume(&self, run_id: &RunId, outcome: ReviewOutcome) -> Result<RunOutcome, RunError> {
        let mut state = self
            .runs
            .load(run_id)
            .await
            .map_err(|e| RunError::new(run_id.clone(), e.into()))?
            .ok_or_else(|| {
                RunError::new(run_id.clone(), ProtocolError::RunNotFound(run_id.to_string()).into())
            })?;

        // A finished run is left as it is.
        if state.status.is_terminal() {
            return Err(RunError::new(
                run_id.clone(),
                ProtocolError::NoPendingReview {
                    run_id: run_id.to_string(),
                }
                .into(),
            ));
        }

        info!(run_id = %state.id, outcome = outcome.tag(), "Run resumed");
        let result = self.resume_inner(&mut state, outcome).await;
        self.settle(state, result).await
    }

    async fn resume_inner(&self, state: &mut RunState, outcome: ReviewOutcome) -> Result<(), AgentError> {
        let (continuation, request) = state.take_pending().ok_or_else(|| ProtocolError::NoPendingReview {
            run_id: state.id.to_string(),
        })?;

        match self.gate.resolve(state, continuation, &request, outcome).await? {
            Resolution::Finished(reason) => state.complete(reason),
            Resolution::Continue => {
                self.action_loop.drive(state).await?;
            }
        }
        Ok(())
    }

    /// Whether the run is waiting on a review outcome.
    pub async fn is_suspended(&self, run_id: &RunId) -> Result<bool, AgentError> {
        Ok(self.load(run_id).await?.is_suspended())
    }

    /// The outstanding review request, if the run is suspended.
    pub async fn pending_review(&self, run_id: &RunId) -> Result<Option<ReviewRequest>, AgentError> {
        Ok(self.load(run_id).await?.pending_review().cloned())
    }

    async fn load(&self, run_id: &RunId) -> Result<RunState, AgentError> {
        self.runs
            .load(run_id)
            .await?
            .ok_or_else(|| ProtocolError::RunNotFound(run_id.to_string()).into())
    }

    /// Persist the run as it stands after a step and report it.
    async fn settle(&self, mut state: RunState, result: Result<(), AgentError>) -> Result<RunOutcome, RunError> {
        if let Err(e) = result {
            error!(run_id = %state.id, kind = e.kind(), error = %e, "Run failed");
            state.fail(e.to_string());
            if let Err(save_err) = self.runs.save(&state).await {
                error!(run_id = %state.id, error = %save_err, "Could not persist failed run");
            }
            self.publish(DomainEvent::ErrorOccurred {
                context: format!("run {}", state.id),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
            self.publish(DomainEvent::RunFinished {
                run_id: state.id.to_string(),
                outcome: "failed".into(),
                timestamp: Utc::now(),
            });
            return Err(RunError::new(state.id, e));
        }

        if let Err(e) = self.runs.save(&state).await {
            error!(run_id = %state.id, error = %e, "Could not persist run");
            return Err(RunError::new(state.id, e.into()));
        }

        if let Some(request) = state.pending_review() {
            return Ok(RunOutcome::Suspended {
                run_id: state.id.clone(),
                request: request.clone(),
            });
        }

        let reason = state.completion.unwrap_or(CompletionReason::NoAction);
        info!(
            run_id = %state.id,
            disposition = ?state.disposition,
            reason = %reason,
            iterations = state.iterations,
            "Run completed"
        );
        self.publish(DomainEvent::RunFinished {
            run_id: state.id.to_string(),
            outcome: reason.to_string(),
            timestamp: Utc::now(),
        });
        Ok(RunOutcome::Completed {
            run_id: state.id,
            disposition: state.disposition,
            reason,
        })
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}
