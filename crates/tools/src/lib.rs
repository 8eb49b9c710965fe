//! Built-in tool implementations for mailgate.
//!
//! These are the executors behind the side-effecting actions the assistant
//! can propose: sending a reply, placing a calendar invite, and checking
//! calendar availability. They are placeholders that describe what they
//! would do; a deployment swaps in real mail/calendar clients behind the
//! same [`Tool`](mailgate_core::Tool) trait.

pub mod check_availability;
pub mod schedule_event;
pub mod send_message;

use mailgate_core::tool::ToolRegistry;

pub use check_availability::CheckAvailabilityTool;
pub use schedule_event::ScheduleEventTool;
pub use send_message::SendMessageTool;

/// Create a registry holding every built-in tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SendMessageTool));
    registry.register(Box::new(ScheduleEventTool));
    registry.register(Box::new(CheckAvailabilityTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtins() {
        let registry = default_registry();
        assert_eq!(
            registry.names(),
            vec!["check_availability", "schedule_event", "send_message"]
        );
        assert_eq!(registry.definitions().len(), 3);
    }
}
