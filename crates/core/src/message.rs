//! Conversation domain types.
//!
//! The conversation is the running transcript the action loop sends to the
//! model: user instructions, assistant turns (optionally proposing actions)
//! and tool-result entries answering those proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions or reviewer feedback on behalf of the user
    User,
    /// The model
    Assistant,
    /// System instructions
    System,
    /// Tool execution result (real or synthetic)
    Tool,
}

/// A single entry in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique entry ID
    pub id: String,

    /// Who produced this entry
    pub role: Role,

    /// The text content
    pub content: String,

    /// Actions proposed by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which proposed action it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user entry.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant entry.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system entry.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool result entry answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// An action proposal embedded in an assistant entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this proposal
    pub id: String,

    /// Name of the proposed action
    pub name: String,

    /// Arguments as a JSON string (as returned by the model)
    pub arguments: String,
}

impl MessageToolCall {
    /// Parse the argument string into a JSON value.
    ///
    /// An empty argument string is read as an empty object.
    pub fn parsed_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.arguments)
    }
}

/// An ordered, append-only sequence of conversation entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered entries
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last entry was added or replaced
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append an entry.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index of the most recent assistant entry.
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role == Role::Assistant)
    }

    /// The most recent assistant entry.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.last_assistant_index().map(|i| &self.messages[i])
    }

    /// Whether a tool-result entry answering `call_id` follows the most recent
    /// assistant entry.
    pub fn is_answered(&self, call_id: &str) -> bool {
        let Some(start) = self.last_assistant_index() else {
            return false;
        };
        self.messages[start + 1..]
            .iter()
            .any(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(call_id))
    }

    /// Substitute the arguments of one proposed action in the most recent
    /// assistant entry.
    ///
    /// The entry is replaced by value: a new `Message` with the same id and
    /// position whose call list carries `arguments` for `call_id`. Every other
    /// entry is untouched. Returns `false` if no such call exists.
    pub fn replace_tool_call_arguments(&mut self, call_id: &str, arguments: String) -> bool {
        let Some(index) = self.last_assistant_index() else {
            return false;
        };
        let current = &self.messages[index];
        if !current.tool_calls.iter().any(|tc| tc.id == call_id) {
            return false;
        }

        let tool_calls = current
            .tool_calls
            .iter()
            .map(|tc| {
                if tc.id == call_id {
                    MessageToolCall {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        arguments: arguments.clone(),
                    }
                } else {
                    tc.clone()
                }
            })
            .collect();

        let replacement = Message {
            tool_calls,
            ..current.clone()
        };
        self.messages[index] = replacement;
        self.updated_at = Utc::now();
        true
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(calls: &[(&str, &str, &str)]) -> Message {
        let mut msg = Message::assistant("");
        msg.tool_calls = calls
            .iter()
            .map(|(id, name, args)| MessageToolCall {
                id: (*id).into(),
                name: (*name).into(),
                arguments: (*args).into(),
            })
            .collect();
        msg
    }

    #[test]
    fn create_user_message() {
        let msg = Message::user("Respond to the email");
        assert_eq!(msg.role, Role::User);
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new();
        let created = conv.created_at;
        conv.push(Message::user("First"));
        assert_eq!(conv.len(), 1);
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn replace_arguments_keeps_identity_and_position() {
        let mut conv = Conversation::new();
        conv.push(Message::user("go"));
        conv.push(proposal(&[
            ("c1", "check_availability", r#"{"day":"Mon"}"#),
            ("c2", "send_message", r#"{"content":"draft"}"#),
        ]));
        let original_id = conv.messages[1].id.clone();

        assert!(conv.replace_tool_call_arguments("c2", r#"{"content":"edited"}"#.into()));

        assert_eq!(conv.len(), 2);
        let entry = &conv.messages[1];
        assert_eq!(entry.id, original_id);
        assert_eq!(entry.tool_calls[0].arguments, r#"{"day":"Mon"}"#);
        assert_eq!(entry.tool_calls[1].id, "c2");
        assert_eq!(entry.tool_calls[1].name, "send_message");
        assert_eq!(entry.tool_calls[1].arguments, r#"{"content":"edited"}"#);
    }

    #[test]
    fn replace_arguments_unknown_call() {
        let mut conv = Conversation::new();
        conv.push(proposal(&[("c1", "send_message", "{}")]));
        assert!(!conv.replace_tool_call_arguments("nope", "{}".into()));
    }

    #[test]
    fn answered_calls_are_tracked_after_last_proposal() {
        let mut conv = Conversation::new();
        conv.push(proposal(&[("c1", "check_availability", "{}"), ("c2", "send_message", "{}")]));
        conv.push(Message::tool_result("c1", "9:00 AM"));
        assert!(conv.is_answered("c1"));
        assert!(!conv.is_answered("c2"));
    }

    #[test]
    fn empty_arguments_parse_as_object() {
        let call = MessageToolCall {
            id: "c".into(),
            name: "mark_done".into(),
            arguments: "".into(),
        };
        assert!(call.parsed_arguments().unwrap().is_object());
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::tool_result("c9", "sent");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Tool);
        assert_eq!(back.tool_call_id.as_deref(), Some("c9"));
    }
}
