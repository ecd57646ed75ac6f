//! Structured Actions
//!
//! The closed set of operations a command can resolve to, and the strict
//! decoder for the model's `{"action": ..., "parameters": {...}}` payload.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Upper bound on a meeting's length (one week)
const MAX_DURATION_MINUTES: u32 = 7 * 24 * 60;

/// Decoding/validation errors for an action payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("response is not a JSON action object: {0}")]
    NotJson(String),

    #[error("invalid parameters for {action}: {reason}")]
    InvalidParameters { action: ActionKind, reason: String },

    #[error("invalid start time {value:?}: expected RFC 3339")]
    InvalidStartTime { value: String },

    #[error("duration must be between 1 and {max} minutes, got {value}")]
    InvalidDuration { value: i64, max: u32 },

    #[error("missing {field}")]
    MissingField { field: &'static str },

    #[error("attendee {index} is blank")]
    BlankAttendee { index: usize },
}

/// Names of the supported actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ScheduleMeeting,
    SendEmail,
    ListEvents,
    SendDailyReminder,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        Self::ScheduleMeeting,
        Self::SendEmail,
        Self::ListEvents,
        Self::SendDailyReminder,
    ];

    /// Wire name the model is asked to emit
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduleMeeting => "schedule_meeting",
            Self::SendEmail => "send_email",
            Self::ListEvents => "get_events",
            Self::SendDailyReminder => "remind",
        }
    }

    /// Human description used in replies
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ScheduleMeeting => "schedule a meeting",
            Self::SendEmail => "send an email",
            Self::ListEvents => "list your upcoming events",
            Self::SendDailyReminder => "send your daily reminder",
        }
    }

    /// Accepts the wire name and a few aliases
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "schedule_meeting" => Some(Self::ScheduleMeeting),
            "send_email" => Some(Self::SendEmail),
            "get_events" | "list_events" => Some(Self::ListEvents),
            "remind" | "send_daily_reminder" | "daily_reminder" => Some(Self::SendDailyReminder),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meeting request, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRequest {
    pub attendees: Vec<String>,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub title: String,
}

impl MeetingRequest {
    /// Validate raw meeting fields (shared by the model path and `/api/schedule`).
    ///
    /// Values are kept exactly as supplied; blank ones are rejected.
    pub fn parse(
        attendees: Vec<String>,
        start_time: &str,
        duration_minutes: i64,
        title: &str,
    ) -> Result<Self, ActionError> {
        let start = DateTime::parse_from_rfc3339(start_time.trim())
            .map_err(|_| ActionError::InvalidStartTime {
                value: start_time.to_string(),
            })?
            .with_timezone(&Utc);

        let duration_minutes = u32::try_from(duration_minutes)
            .ok()
            .filter(|d| (1..=MAX_DURATION_MINUTES).contains(d))
            .ok_or(ActionError::InvalidDuration {
                value: duration_minutes,
                max: MAX_DURATION_MINUTES,
            })?;

        if title.trim().is_empty() {
            return Err(ActionError::MissingField { field: "title" });
        }

        if let Some(index) = attendees.iter().position(|a| a.trim().is_empty()) {
            return Err(ActionError::BlankAttendee { index });
        }

        Ok(Self {
            attendees,
            start,
            duration_minutes,
            title: title.to_string(),
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration()
    }
}

/// Email request; `body: None` means "generate one"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub body: Option<String>,
}

impl EmailRequest {
    pub fn parse(to: &str, subject: &str, body: Option<String>) -> Result<Self, ActionError> {
        if to.trim().is_empty() {
            return Err(ActionError::MissingField { field: "to_email" });
        }
        if subject.trim().is_empty() {
            return Err(ActionError::MissingField { field: "subject" });
        }
        Ok(Self {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.filter(|b| !b.trim().is_empty()),
        })
    }
}

/// What a command resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ScheduleMeeting(MeetingRequest),
    SendEmail(EmailRequest),
    ListEvents,
    SendDailyReminder,
    /// Well-formed payload naming an action outside the closed set
    Unrecognized { action: String },
}

impl Action {
    pub fn kind(&self) -> Option<ActionKind> {
        match self {
            Self::ScheduleMeeting(_) => Some(ActionKind::ScheduleMeeting),
            Self::SendEmail(_) => Some(ActionKind::SendEmail),
            Self::ListEvents => Some(ActionKind::ListEvents),
            Self::SendDailyReminder => Some(ActionKind::SendDailyReminder),
            Self::Unrecognized { .. } => None,
        }
    }

    /// Strictly decode a model payload.
    ///
    /// An unknown action name is not an error: it yields [`Action::Unrecognized`].
    pub fn decode(text: &str) -> Result<Self, ActionError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ActionError::NotJson(e.to_string()))?;

        let Some(kind) = ActionKind::from_name(&envelope.action) else {
            return Ok(Self::Unrecognized {
                action: envelope.action,
            });
        };

        let parameters = if envelope.parameters.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            envelope.parameters
        };
        let invalid = |e: serde_json::Error| ActionError::InvalidParameters {
            action: kind,
            reason: e.to_string(),
        };

        match kind {
            ActionKind::ScheduleMeeting => {
                let p: MeetingParameters = serde_json::from_value(parameters).map_err(invalid)?;
                Ok(Self::ScheduleMeeting(MeetingRequest::parse(
                    p.attendees,
                    &p.start_time,
                    p.duration_minutes,
                    &p.title,
                )?))
            }
            ActionKind::SendEmail => {
                let p: EmailParameters = serde_json::from_value(parameters).map_err(invalid)?;
                Ok(Self::SendEmail(EmailRequest::parse(&p.to_email, &p.subject, p.body)?))
            }
            ActionKind::ListEvents => Ok(Self::ListEvents),
            ActionKind::SendDailyReminder => Ok(Self::SendDailyReminder),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    action: String,
    #[serde(default)]
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MeetingParameters {
    #[serde(default)]
    attendees: Vec<String>,
    start_time: String,
    duration_minutes: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct EmailParameters {
    to_email: String,
    subject: String,
    #[serde(default)]
    body: Option<String>,
}
