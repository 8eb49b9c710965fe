//! The orchestration core of mailgate.
//!
//! A run follows **classify → (review) → act**:
//!
//! 1. **Classify** the inbound message as `respond`, `notify` or `ignore`
//! 2. **Ignore** ends the run; **notify** suspends it on a triage review
//! 3. **Respond** enters the action loop, which proposes actions one model
//!    turn at a time and sends the risky ones through the suspension gate
//! 4. Reviewer answers feed back into the preference store, so the next
//!    run is classified and drafted with what was learned
//!
//! Suspension is a value, not a blocked task: the run is persisted and the
//! caller resumes it later with exactly one [`ReviewOutcome`](mailgate_core::ReviewOutcome).

pub mod action_loop;
pub mod actions;
pub mod classifier;
pub mod error;
pub mod gate;
pub mod prompts;
pub mod render;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use action_loop::{ActionLoop, LoopOutcome};
pub use actions::{ActionCatalog, ActionKind};
pub use classifier::{Classification, Classifier};
pub use error::{AgentError, RunError};
pub use gate::{Resolution, SuspensionGate};
pub use workflow::{RunOutcome, WorkflowController};
