//! Review request and outcome value objects.
//!
//! A [`ReviewRequest`] is what a suspended run shows to the human reviewer; a
//! [`ReviewOutcome`] is the single answer that resumes it. The wire shape is
//! `{"action_request": {...}, "config": {...}, "description": "..."}` for
//! requests and `{"type": "...", "args": ...}` for outcomes.

use serde::{Deserialize, Serialize};

/// The proposed action under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action name, or a triage label for a pure triage review
    pub action: String,

    /// Proposed arguments (an empty object for triage review)
    pub args: serde_json::Value,
}

/// Which outcome tags the reviewer may answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPermissions {
    pub allow_accept: bool,
    pub allow_edit: bool,
    pub allow_respond: bool,
    pub allow_ignore: bool,
}

impl ReviewPermissions {
    /// Every outcome permitted.
    pub const ALL: ReviewPermissions = ReviewPermissions {
        allow_accept: true,
        allow_edit: true,
        allow_respond: true,
        allow_ignore: true,
    };

    /// Answer or drop only: nothing to execute or edit.
    pub const ANSWER_ONLY: ReviewPermissions = ReviewPermissions {
        allow_accept: false,
        allow_edit: false,
        allow_respond: true,
        allow_ignore: true,
    };

    /// Triage review: no payload to edit.
    pub const TRIAGE: ReviewPermissions = ReviewPermissions {
        allow_accept: true,
        allow_edit: false,
        allow_respond: true,
        allow_ignore: true,
    };

    /// Whether `outcome` is allowed. `Abort` is always allowed.
    pub fn permits(&self, outcome: &ReviewOutcome) -> bool {
        match outcome {
            ReviewOutcome::Accept => self.allow_accept,
            ReviewOutcome::Edit(_) => self.allow_edit,
            ReviewOutcome::Respond(_) => self.allow_respond,
            ReviewOutcome::Ignore => self.allow_ignore,
            ReviewOutcome::Abort => true,
        }
    }
}

/// What a suspended run presents to the reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub action_request: ActionRequest,

    #[serde(rename = "config")]
    pub permissions: ReviewPermissions,

    /// Markdown combining the original message with the proposed action
    pub description: String,
}

/// The reviewer's answer to one [`ReviewRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Execute the action as proposed
    Accept,

    /// Execute the action with these replacement arguments
    Edit(serde_json::Value),

    /// Do not execute; hand this free-text feedback to the model
    #[serde(rename = "response", alias = "respond")]
    Respond(String),

    /// Do not execute
    Ignore,

    /// Terminate the run without executing anything
    Abort,
}

impl ReviewOutcome {
    /// The wire tag, for logs and errors.
    pub fn tag(&self) -> &'static str {
        match self {
            ReviewOutcome::Accept => "accept",
            ReviewOutcome::Edit(_) => "edit",
            ReviewOutcome::Respond(_) => "response",
            ReviewOutcome::Ignore => "ignore",
            ReviewOutcome::Abort => "abort",
        }
    }
}
