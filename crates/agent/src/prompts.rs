//! Prompt templates for the classifier and the action loop, and the
//! feedback notes handed to the preference writer.

use chrono::NaiveDate;
use mailgate_core::inbound::InboundMessage;
use mailgate_core::provider::ToolDefinition;
use mailgate_memory::defaults::UPDATE_REINFORCEMENT;

use crate::actions::{ActionKind, MARK_DONE};
use crate::render::email_markdown;

const TRIAGE_SYSTEM: &str = "\
< Role >
Your role is to triage incoming emails based upon instructions and background information below.
</ Role >

< Background >
{background}
</ Background >

< Instructions >
Categorize each email into one of three categories:
1. IGNORE - Emails that are not worth responding to or tracking
2. NOTIFY - Important information that is worth notification but doesn't require a response
3. RESPOND - Emails that need a direct response
Classify the below email into one of these categories.
</ Instructions >

< Rules >
{triage_instructions}
</ Rules >
";

const AGENT_SYSTEM: &str = "\
< Role >
You are a top-notch executive assistant who cares about helping your executive perform as well as possible.
</ Role >

< Tools >
You have access to the following tools to help manage communications and schedule:
{tools}
</ Tools >

< Instructions >
When handling emails, follow these steps:
1. Carefully analyze the email content and purpose
2. IMPORTANT: always call a tool and call one tool at a time until the task is complete
3. If the background information, meeting preferences, or response preferences below are not sufficient, use ask_question to ask a follow-up question
4. For meeting requests, use check_availability to find open time slots
5. Schedule meetings with schedule_event when appropriate
   - Today's date is {today}; use this for scheduling meetings accurately
6. If you scheduled a meeting, then draft a short response email using send_message
7. Draft response emails using send_message
8. After calling send_message, the task is complete
9. Once the email has been sent, call {mark_done} on its own to indicate that the task is complete
</ Instructions >

< Response Preferences >
{response_preferences}
</ Response Preferences >

< Calendar Preferences >
{cal_preferences}
</ Calendar Preferences >

< Background >
{background}
</ Background >
";

pub fn triage_system_prompt(background: &str, triage_instructions: &str) -> String {
    TRIAGE_SYSTEM
        .replace("{background}", background)
        .replace("{triage_instructions}", triage_instructions)
}

pub fn triage_user_prompt(message: &InboundMessage) -> String {
    format!(
        "Please determine how to handle the below email thread:\n\nFrom: {}\nTo: {}\nSubject: {}\n{}",
        message.author, message.to, message.subject, message.body
    )
}

/// Opening instruction for a message routed to `respond`.
pub fn respond_instruction(message: &InboundMessage) -> String {
    format!("Respond to the email: {}", email_markdown(message))
}

/// Preferences embedded in the agent system prompt, read fresh each turn.
pub struct AgentContext<'a> {
    pub tools: &'a [ToolDefinition],
    pub response_preferences: &'a str,
    pub cal_preferences: &'a str,
    pub background: &'a str,
    pub today: NaiveDate,
}

pub fn agent_system_prompt(ctx: &AgentContext<'_>) -> String {
    let tools = ctx
        .tools
        .iter()
        .enumerate()
        .map(|(i, def)| format!("{}. {}({}) - {}", i + 1, def.name, parameter_names(def), def.description))
        .collect::<Vec<_>>()
        .join("\n");

    AGENT_SYSTEM
        .replace("{tools}", &tools)
        .replace("{today}", &ctx.today.format("%Y-%m-%d").to_string())
        .replace("{mark_done}", MARK_DONE)
        .replace("{response_preferences}", ctx.response_preferences)
        .replace("{cal_preferences}", ctx.cal_preferences)
        .replace("{background}", ctx.background)
}

fn parameter_names(def: &ToolDefinition) -> String {
    def.parameters["properties"]
        .as_object()
        .map(|props| props.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_default()
}

/// Note for an edited draft: the proposal before and after the edit.
pub fn edit_feedback(kind: &ActionKind, original: &serde_json::Value, edited: &serde_json::Value) -> String {
    let (subject, noun) = match kind {
        ActionKind::ScheduleEvent => ("calendar invitation", "calendar invitation"),
        _ => ("email response", "email"),
    };
    format!(
        "User edited the {subject}. Here is the initial {noun} generated by the assistant: {}: {original}. \
         Here is the edited {noun}: {edited}. Follow all instructions above, and remember: {UPDATE_REINFORCEMENT}",
        kind.name()
    )
}

/// Note for an ignored draft: this kind of message should not be answered.
pub fn ignore_triage_feedback(kind: &ActionKind) -> String {
    let what = match kind {
        ActionKind::ScheduleEvent => {
            "The user ignored the calendar meeting draft. That means they did not want to schedule a meeting for this email."
        }
        _ => "The user ignored the email draft. That means they did not want to respond to the email.",
    };
    format!(
        "{what} Update the triage preferences to ensure emails of this type are not classified as respond. \
         Follow all instructions above, and remember: {UPDATE_REINFORCEMENT}"
    )
}

/// Note for feedback given instead of executing an action.
pub fn respond_feedback(kind: &ActionKind, feedback: &str) -> String {
    let target = match kind {
        ActionKind::ScheduleEvent => "the calendar preferences",
        ActionKind::AskQuestion => "the background information about the user",
        _ => "the response preferences",
    };
    format!(
        "User gave feedback, which we can use to update {target}. Feedback: {feedback}. \
         Follow all instructions above, and remember: {UPDATE_REINFORCEMENT}"
    )
}

/// Note for a `notify` message the reviewer wanted to answer.
pub fn triage_respond_feedback(feedback: &str) -> String {
    format!(
        "The user decided to respond to the email, so update the triage preferences to capture this. Feedback: {feedback}. \
         Follow all instructions above, and remember: {UPDATE_REINFORCEMENT}"
    )
}

/// Note for a `notify` message the reviewer dropped.
pub fn triage_ignore_feedback() -> String {
    format!(
        "The user decided to ignore the email even though it was classified as notify. Update triage preferences to capture this. \
         Follow all instructions above, and remember: {UPDATE_REINFORCEMENT}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn triage_prompts_embed_inputs() {
        let system = triage_system_prompt("I lead the platform team", "Ignore newsletters");
        assert!(system.contains("I lead the platform team"));
        assert!(system.contains("Ignore newsletters"));
        assert!(system.contains("1. IGNORE"));

        let msg = InboundMessage::new("alice@example.com", "me@example.com", "Docs", "Where are they?");
        let user = triage_user_prompt(&msg);
        assert!(user.contains("From: alice@example.com\nTo: me@example.com\nSubject: Docs\nWhere are they?"));
    }

    #[test]
    fn agent_prompt_lists_tools_and_preferences() {
        let tools = vec![ToolDefinition {
            name: "send_message".into(),
            description: "Write and send an email.".into(),
            parameters: json!({"type": "object", "properties": {"to": {}, "subject": {}, "content": {}}}),
        }];
        let prompt = agent_system_prompt(&AgentContext {
            tools: &tools,
            response_preferences: "Be brief",
            cal_preferences: "Mornings only",
            background: "Works on tooling",
            today: NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
        });
        assert!(prompt.contains("1. send_message("));
        assert!(prompt.contains(") - Write and send an email."));
        assert!(prompt.contains("Today's date is 2025-04-21"));
        assert!(prompt.contains("call mark_done on its own"));
        assert!(prompt.contains("Be brief"));
        assert!(prompt.contains("Mornings only"));
        assert!(prompt.contains("Works on tooling"));
    }

    #[test]
    fn edit_feedback_shows_before_and_after() {
        let note = edit_feedback(
            &ActionKind::SendMessage,
            &json!({"content": "Sure."}),
            &json!({"content": "Sure, Tuesday at 2pm."}),
        );
        assert!(note.contains("initial email"));
        assert!(note.contains("Sure."));
        assert!(note.contains("Tuesday at 2pm"));
        assert!(note.contains("NEVER overwrite the entire profile"));

        let cal = edit_feedback(&ActionKind::ScheduleEvent, &json!({}), &json!({}));
        assert!(cal.contains("calendar invitation"));
    }

    #[test]
    fn feedback_notes_carry_text() {
        assert!(respond_feedback(&ActionKind::AskQuestion, "Room 4").contains("Room 4"));
        assert!(triage_respond_feedback("reply to HR").contains("reply to HR"));
        assert!(triage_ignore_feedback().contains("classified as notify"));
        assert!(ignore_triage_feedback(&ActionKind::ScheduleEvent).contains("calendar meeting draft"));
    }
}
