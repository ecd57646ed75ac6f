//! Intent Resolver
//!
//! Turns a free-text command into a structured [`Action`] with a single
//! language-model call. The model's reply is decoded strictly; when that
//! fails, a narrow keyword check only works out *which* action was meant so
//! the error can say so. It never extracts parameters and never acts.

use crate::action::{Action, ActionError, ActionKind};
use crate::capabilities::{LanguageModelCapability, UpstreamError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Resolver failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntentError {
    #[error("Failed to process command: {0}")]
    Upstream(#[from] UpstreamError),

    /// The reply named a supported action but its parameters were unusable
    #[error("could not read the details for {intended}: {reason}")]
    Malformed {
        intended: ActionKind,
        raw: String,
        reason: ActionError,
    },

    #[error("model reply did not match any supported action")]
    Unparseable { raw: String },
}

// Keyword sets for the diagnostic fallback
static SCHEDULE_KEYWORDS: &[&str] = &["schedule", "meeting", "book", "invite", "set up a call"];

static EMAIL_KEYWORDS: &[&str] = &["email", "e-mail", "mail to", "to_email", "subject"];

static LIST_KEYWORDS: &[&str] = &["events", "calendar", "agenda", "upcoming", "what's on"];

static REMINDER_KEYWORDS: &[&str] = &["remind", "reminder", "daily summary", "briefing"];

static ACTION_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(schedule_meeting|send_email|get_events|list_events|send_daily_reminder|daily_reminder|remind)\b",
    )
    .unwrap()
});

static FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap());

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    match FENCE_PATTERN.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Best guess at which action a reply was aiming for.
///
/// Explicit action names win; otherwise the keyword set with the most hits,
/// and no guess on a tie.
pub fn detect_intended_action(text: &str) -> Option<ActionKind> {
    if let Some(m) = ACTION_NAME_PATTERN.captures(text).and_then(|c| c.get(1)) {
        return ActionKind::from_name(m.as_str());
    }

    let lower = text.to_lowercase();
    let score = |keywords: &[&str]| keywords.iter().filter(|k| lower.contains(*k)).count();

    let mut scores = [
        (ActionKind::ScheduleMeeting, score(SCHEDULE_KEYWORDS)),
        (ActionKind::SendEmail, score(EMAIL_KEYWORDS)),
        (ActionKind::ListEvents, score(LIST_KEYWORDS)),
        (ActionKind::SendDailyReminder, score(REMINDER_KEYWORDS)),
    ];
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    match scores {
        [(_, 0), ..] => None,
        [(best, top), (_, second), ..] if top > second => Some(best),
        _ => None,
    }
}

/// Resolves commands through the language model
pub struct IntentResolver {
    model: Arc<dyn LanguageModelCapability>,
    timezone: Tz,
}

impl IntentResolver {
    pub fn new(model: Arc<dyn LanguageModelCapability>, timezone: Tz) -> Self {
        Self { model, timezone }
    }

    /// Prompt listing every supported action and its exact parameter schema
    pub fn build_prompt(&self, command: &str, now: DateTime<Utc>) -> String {
        let local_now = now.with_timezone(&self.timezone);
        format!(
            r#"You are an executive assistant. Convert the user's command into exactly one action.

Current time: {now} ({tz})

Supported actions and their parameters:
- "{schedule}": {{"attendees": [email, ...], "start_time": RFC 3339 timestamp with offset, "duration_minutes": integer, "title": string}}
- "{email}": {{"to_email": email, "subject": string, "body": string (optional, omit to have it written for you)}}
- "{list}": {{}}
- "{remind}": {{}}

If the command does not fit any of these, use "unknown" as the action.

Respond with ONLY a JSON object of the form {{"action": "<name>", "parameters": {{...}}}} and no other text.

Command: {command}"#,
            now = local_now.to_rfc3339(),
            tz = self.timezone.name(),
            schedule = ActionKind::ScheduleMeeting,
            email = ActionKind::SendEmail,
            list = ActionKind::ListEvents,
            remind = ActionKind::SendDailyReminder,
            command = command,
        )
    }

    /// Resolve a command; makes exactly one model call
    pub async fn resolve(&self, command: &str) -> Result<Action, IntentError> {
        let prompt = self.build_prompt(command, Utc::now());
        let raw = self.model.complete(&prompt).await?;
        debug!(model = self.model.name(), reply_len = raw.len(), "Model replied");
        Self::interpret(raw)
    }

    /// Decode a model reply
    pub fn interpret(raw: String) -> Result<Action, IntentError> {
        match Action::decode(strip_code_fence(&raw)) {
            Ok(action) => {
                if let Action::Unrecognized { action: name } = &action {
                    info!(action = %name, "Model chose an unsupported action");
                }
                Ok(action)
            }
            Err(reason) => {
                warn!(raw = %raw, "Could not decode model reply: {}", reason);
                match detect_intended_action(&raw) {
                    Some(intended) => Err(IntentError::Malformed {
                        intended,
                        raw,
                        reason,
                    }),
                    None => Err(IntentError::Unparseable { raw }),
                }
            }
        }
    }
}
