//! Send message tool: writes and sends an email reply.
//!
//! Placeholder executor: reports what it would send. The reviewer sees the
//! draft before this ever runs.

use async_trait::async_trait;
use mailgate_core::error::ToolError;
use mailgate_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use tracing::info;

pub struct SendMessageTool;

#[derive(Debug, Deserialize)]
struct SendMessageArgs {
    to: String,
    subject: String,
    content: String,
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Write and send an email."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "Recipient email address"
                },
                "subject": {
                    "type": "string",
                    "description": "Email subject line"
                },
                "content": {
                    "type": "string",
                    "description": "Email body"
                }
            },
            "required": ["to", "subject", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: SendMessageArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("send_message: {e}")))?;

        if args.to.trim().is_empty() {
            return Err(ToolError::InvalidArguments("Recipient 'to' must not be empty".into()));
        }

        info!(to = %args.to, subject = %args.subject, "Sending email");
        Ok(ToolResult::ok(format!(
            "Email sent to {} with subject '{}' and content: {}",
            args.to, args.subject, args.content
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_with_all_fields() {
        let result = SendMessageTool
            .execute(serde_json::json!({
                "to": "alice@example.com",
                "subject": "Re: API docs",
                "content": "Thanks, I'll look into it."
            }))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.starts_with("Email sent to alice@example.com"));
        assert!(result.output.contains("'Re: API docs'"));
    }

    #[tokio::test]
    async fn missing_field_is_invalid() {
        let err = SendMessageTool
            .execute(serde_json::json!({"to": "alice@example.com"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn blank_recipient_is_invalid() {
        let err = SendMessageTool
            .execute(serde_json::json!({"to": " ", "subject": "s", "content": "c"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
