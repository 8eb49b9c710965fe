//! Schedule event tool: places a calendar invite.

use async_trait::async_trait;
use chrono::NaiveDate;
use mailgate_core::error::ToolError;
use mailgate_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use tracing::info;

pub struct ScheduleEventTool;

#[derive(Debug, Deserialize)]
struct ScheduleEventArgs {
    attendees: Vec<String>,
    subject: String,
    duration_minutes: u32,
    /// ISO date, `YYYY-MM-DD`
    preferred_day: String,
    /// Hour of day, 0-23
    start_time: u32,
}

#[async_trait]
impl Tool for ScheduleEventTool {
    fn name(&self) -> &str {
        "schedule_event"
    }

    fn description(&self) -> &str {
        "Schedule a calendar meeting."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "attendees": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Attendee email addresses"
                },
                "subject": {
                    "type": "string",
                    "description": "Meeting title"
                },
                "duration_minutes": {
                    "type": "integer",
                    "description": "Meeting length in minutes"
                },
                "preferred_day": {
                    "type": "string",
                    "description": "Meeting date as YYYY-MM-DD"
                },
                "start_time": {
                    "type": "integer",
                    "description": "Start hour, 24-hour clock (e.g. 14 for 2pm)"
                }
            },
            "required": ["attendees", "subject", "duration_minutes", "preferred_day", "start_time"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: ScheduleEventArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("schedule_event: {e}")))?;

        let day = NaiveDate::parse_from_str(args.preferred_day.trim(), "%Y-%m-%d").map_err(|e| {
            ToolError::InvalidArguments(format!(
                "preferred_day '{}' is not a YYYY-MM-DD date: {e}",
                args.preferred_day
            ))
        })?;

        if args.start_time > 23 {
            return Err(ToolError::InvalidArguments(format!(
                "start_time must be an hour between 0 and 23, got {}",
                args.start_time
            )));
        }
        if args.duration_minutes == 0 {
            return Err(ToolError::InvalidArguments("duration_minutes must be positive".into()));
        }

        let date_str = day.format("%A, %B %d, %Y").to_string();
        info!(subject = %args.subject, %date_str, attendees = args.attendees.len(), "Scheduling meeting");
        Ok(ToolResult::ok(format!(
            "Meeting '{}' scheduled on {} at {} for {} minutes with {} attendees",
            args.subject,
            date_str,
            args.start_time,
            args.duration_minutes,
            args.attendees.len()
        )))
    }
}
