//! Inbound messages and their triage disposition.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The unit of work: one message accepted into a run.
///
/// Accepts both the standard field names (`author`, `to`, `email_thread`)
/// and the mailbox-export names (`from_email`, `to_email`, `page_content`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Source message ID, if the mailbox provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Thread ID, if the mailbox provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Sender identity
    #[serde(alias = "from_email", default = "unknown_sender")]
    pub author: String,

    /// Recipient identity
    #[serde(alias = "to_email", default = "unknown_recipient")]
    pub to: String,

    /// Subject line
    #[serde(default = "no_subject")]
    pub subject: String,

    /// Body text (full thread)
    #[serde(alias = "email_thread", alias = "page_content", alias = "content", default)]
    pub body: String,
}

fn unknown_sender() -> String {
    "Unknown Sender".into()
}
fn unknown_recipient() -> String {
    "Unknown Recipient".into()
}
fn no_subject() -> String {
    "No Subject".into()
}

impl InboundMessage {
    pub fn new(
        author: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            thread_id: None,
            author: author.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// The three-way triage outcome for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Needs a reply: enter the action loop
    Respond,
    /// Worth knowing about: show to the reviewer, then stop
    Notify,
    /// Not worth attention: stop immediately
    Ignore,
}

impl Disposition {
    pub const ALL: [Disposition; 3] = [Disposition::Respond, Disposition::Notify, Disposition::Ignore];

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Respond => "respond",
            Disposition::Notify => "notify",
            Disposition::Ignore => "ignore",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "respond" => Ok(Disposition::Respond),
            "notify" => Ok(Disposition::Notify),
            "ignore" => Ok(Disposition::Ignore),
            other => Err(format!("unknown disposition '{other}'")),
        }
    }
}
