//! Seed preference content and the extraction prompts used to revise it.

/// Seed for the `background` collection.
pub const DEFAULT_BACKGROUND: &str = "I'm a software engineer. I work with a small team on developer tooling.";

/// Seed for the `response_style` profile.
pub const DEFAULT_RESPONSE_STYLE: &str = "\
Use professional and concise language. If the e-mail mentions a deadline, make sure to explicitly acknowledge and reference the deadline in your response.

When responding to technical questions that require investigation:
- Clearly state whether you will investigate or who you will ask
- Provide an estimated timeline for when you'll have more information or complete the task

When responding to event or conference invitations:
- Always acknowledge any mentioned deadlines (particularly registration deadlines)
- If workshops or specific topics are mentioned, ask for more specific details about them
- If discounts (group or early bird) are mentioned, explicitly request information about them
- Don't commit

When responding to collaboration or project-related requests:
- Acknowledge any existing work or materials mentioned (drafts, slides, documents, etc.)
- Explicitly mention reviewing these materials before or during the meeting
- When scheduling meetings, clearly state the specific day, date, and time proposed

When responding to meeting scheduling requests:
- If times are proposed, verify calendar availability for all time slots mentioned in the original email and then commit to one of the proposed times based on your availability by scheduling the meeting. Or, say you can't make it at the time proposed.
- If no times are proposed, then check your calendar for availability and propose multiple time options when available instead of selecting just one.
- Mention the meeting duration in your response to confirm you've noted it correctly.
- Reference the meeting's purpose in your response.";

/// Seed for the `calendar` profile.
pub const DEFAULT_CALENDAR: &str =
    "30 minute meetings are preferred, but 15 minute meetings are also acceptable.";

/// Seed for the `triage` profile.
pub const DEFAULT_TRIAGE: &str = "\
Emails that are not worth responding to:
- Marketing newsletters and promotional emails
- Spam or suspicious emails
- CC'd on FYI threads with no direct questions

There are also other things that should be known about, but don't require an email response. For these, you should notify (using the `notify` response). Examples of this include:
- Team member out sick or on vacation
- Build system notifications or deployments
- Project status updates without action items
- Important company announcements
- FYI emails that contain relevant information for current projects
- HR Department deadline reminders
- Subscription status / renewal reminders
- GitHub notifications

Emails that are worth responding to:
- Direct questions from team members requiring expertise
- Meeting requests requiring confirmation
- Critical bug reports related to team's projects
- Requests from management requiring acknowledgment
- Client inquiries about project status or features
- Technical questions about documentation, code, or APIs (especially questions about missing endpoints or features)
- Personal reminders related to family
- Personal reminders related to self-care (doctor appointments, etc)";

/// System prompt for revising a profile. Placeholders: `{namespace}`, `{current_profile}`.
pub const PROFILE_UPDATE_INSTRUCTIONS: &str = r#"# Role and Objective
You are a memory profile manager for an email assistant agent that selectively updates user preferences based on feedback messages from human-in-the-loop interactions with the email assistant.

# Instructions
- NEVER overwrite the entire memory profile
- ONLY make targeted additions of new information
- ONLY update specific facts that are directly contradicted by feedback messages
- PRESERVE all other existing information in the profile
- Format the profile consistently with the original style
- Generate the profile as a string

# Reasoning Steps
1. Analyze the current memory profile structure and content
2. Review feedback messages from human-in-the-loop interactions
3. Extract relevant user preferences from these feedback messages (such as edits to emails/calendar invites, explicit feedback on assistant performance, user decisions to ignore certain emails)
4. Compare new information against existing profile
5. Identify only specific facts to add or update
6. Preserve all other existing information
7. Output the complete updated profile

# Example
<memory_profile>
RESPOND:
- wife
- specific questions
- system admin notifications
NOTIFY:
- meeting invites
IGNORE:
- marketing emails
- company-wide announcements
- messages meant for other teams
</memory_profile>

<user_messages>
"The assistant shouldn't have responded to that system admin notification."
</user_messages>

<updated_profile>
RESPOND:
- wife
- specific questions
NOTIFY:
- meeting invites
- system admin notifications
IGNORE:
- marketing emails
- company-wide announcements
- messages meant for other teams
</updated_profile>

# Process current profile for {namespace}
<memory_profile>
{current_profile}
</memory_profile>

Think step by step about what specific feedback is being provided and what specific information should be added or updated in the profile while preserving everything else."#;

/// System prompt for revising a collection. Placeholders: `{namespace}`, `{entries}`.
pub const COLLECTION_UPDATE_INSTRUCTIONS: &str = r#"# Role and Objective
You maintain a collection of discrete background facts about the user of an email assistant. Each fact is a separate entry with a key.

# Instructions
- Add a new entry for each new, durable fact revealed by the feedback messages
- Never rewrite an existing entry; if a fact is now wrong, list its key for removal and add the corrected fact as a new entry
- Only remove entries that the feedback directly contradicts
- Return empty lists when nothing should change

# Current entries for {namespace}
<entries>
{entries}
</entries>"#;

/// Appended to every feedback message sent to the extractor.
pub const UPDATE_REINFORCEMENT: &str = "
Remember:
- NEVER overwrite the entire profile
- ONLY make targeted additions or changes based on explicit feedback
- PRESERVE all existing information not directly contradicted
- Output the complete updated profile as a string
";

/// Opening user turn that precedes the feedback messages.
pub const UPDATE_USER_PROMPT: &str =
    "Think carefully and update the memory profile based upon these user messages:";
