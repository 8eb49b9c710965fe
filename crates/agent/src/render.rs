//! Markdown shown to the reviewer, and plain-text transcripts handed to the
//! preference extractor.

use mailgate_core::inbound::InboundMessage;
use mailgate_core::message::{Conversation, Role};

use crate::actions::{ASK_QUESTION, SCHEDULE_EVENT, SEND_MESSAGE};

/// The original message as a markdown block.
pub fn email_markdown(message: &InboundMessage) -> String {
    format!(
        "\n\n**Subject**: {}\n**From**: {}\n**To**: {}\n\n{}\n\n---\n",
        message.subject, message.author, message.to, message.body
    )
}

/// A proposed action as markdown, specialised for the built-in drafts.
pub fn action_markdown(name: &str, args: &serde_json::Value) -> String {
    let field = |key: &str| text_field(args, key);
    match name {
        SEND_MESSAGE => format!(
            "# Email Draft\n\n**To**: {}\n**Subject**: {}\n\n{}\n",
            field("to"),
            field("subject"),
            field("content")
        ),
        SCHEDULE_EVENT => {
            let attendees = args["attendees"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .map(|a| a.as_str().map(str::to_string).unwrap_or_else(|| a.to_string()))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!(
                "# Calendar Invite\n\n**Meeting**: {}\n**Attendees**: {}\n**Duration**: {} minutes\n**Day**: {}\n",
                field("subject"),
                attendees,
                field("duration_minutes"),
                field("preferred_day")
            )
        }
        ASK_QUESTION => format!("# Question for User\n\n{}\n", field("content")),
        other => format!(
            "# Tool Call: {other}\n\nArguments:\n{}\n",
            serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string())
        ),
    }
}

/// Description for an action review: message context, then the action.
pub fn review_description(message: &InboundMessage, name: &str, args: &serde_json::Value) -> String {
    format!("{}{}", email_markdown(message), action_markdown(name, args))
}

/// The conversation as role-prefixed plain text, one entry per paragraph.
pub fn transcript(conversation: &Conversation) -> String {
    conversation
        .messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            let mut entry = format!("{role}: {}", m.content);
            for call in &m.tool_calls {
                entry.push_str(&format!("\n-> {}({})", call.name, call.arguments));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn text_field(args: &serde_json::Value, key: &str) -> String {
    match &args[key] {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
