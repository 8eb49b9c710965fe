//! Check availability tool: read-only calendar lookup.
//!
//! Never gated for review: it has no side effects.

use async_trait::async_trait;
use mailgate_core::error::ToolError;
use mailgate_core::tool::{Tool, ToolResult};
use tracing::debug;

pub struct CheckAvailabilityTool;

/// Slots the placeholder calendar reports as free on any day.
const OPEN_SLOTS: [&str; 3] = ["9:00 AM", "2:00 PM", "4:00 PM"];

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &str {
        "check_availability"
    }

    fn description(&self) -> &str {
        "Check calendar availability for a given day."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "day": {
                    "type": "string",
                    "description": "The day to check, e.g. 2025-04-22 or Tuesday"
                }
            },
            "required": ["day"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let day = arguments["day"]
            .as_str()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'day' argument".into()))?;

        debug!(day, "Checking calendar availability");
        Ok(ToolResult::ok(format!(
            "Available times on {day}: {}",
            OPEN_SLOTS.join(", ")
        )))
    }
}
