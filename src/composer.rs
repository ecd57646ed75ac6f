//! Notification Composer
//!
//! Pure builders for every human-readable text the assistant produces:
//! confirmation and reminder emails, event listings and the prompts sent to
//! the language model for generated content. No I/O.

use crate::capabilities::Event;
use crate::orchestrator::OperationOutcome;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

const LONG_TIME_FORMAT: &str = "%A, %B %-d, %Y at %-I:%M %p";
const SHORT_TIME_FORMAT: &str = "%-I:%M %p";
const DAY_TIME_FORMAT: &str = "%a %b %-d, %-I:%M %p";

pub const DAILY_REMINDER_SUBJECT: &str = "Your Daily Schedule Reminder";

/// Formats everything in the operator's time zone
#[derive(Debug, Clone, Copy)]
pub struct Composer {
    timezone: Tz,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl Composer {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// "Monday, January 15, 2024 at 10:00 AM"
    pub fn long_time(&self, time: DateTime<Utc>) -> String {
        time.with_timezone(&self.timezone).format(LONG_TIME_FORMAT).to_string()
    }

    /// "10:00 AM"
    pub fn short_time(&self, time: DateTime<Utc>) -> String {
        time.with_timezone(&self.timezone).format(SHORT_TIME_FORMAT).to_string()
    }

    pub fn confirmation_subject(&self, title: &str) -> String {
        format!("Meeting Scheduled: {}", title)
    }

    /// HTML body of the per-attendee meeting confirmation
    pub fn confirmation_body(
        &self,
        title: &str,
        start: DateTime<Utc>,
        duration_minutes: u32,
        attendees: &[String],
    ) -> String {
        format!(
            "<h2>Meeting Scheduled</h2>\n\
             <p><strong>Title:</strong> {}</p>\n\
             <p><strong>Time:</strong> {}</p>\n\
             <p><strong>Duration:</strong> {} minutes</p>\n\
             <p><strong>Attendees:</strong> {}</p>\n\
             <p>This meeting has been automatically scheduled by your AI assistant.</p>\n",
            escape_html(title),
            self.long_time(start),
            duration_minutes,
            escape_html(&attendees.join(", ")),
        )
    }

    /// One "- title at time" line per event
    pub fn event_lines(&self, events: &[Event]) -> String {
        events
            .iter()
            .map(|e| format!("- {} at {}\n", e.title(), self.short_time(e.start_time())))
            .collect()
    }

    /// Reply text for a listing request
    pub fn events_listing(&self, events: &[Event]) -> String {
        if events.is_empty() {
            return "You have no upcoming events.".to_string();
        }
        let lines: String = events
            .iter()
            .map(|e| {
                format!(
                    "- {} at {}\n",
                    e.title(),
                    e.start_time().with_timezone(&self.timezone).format(DAY_TIME_FORMAT)
                )
            })
            .collect();
        format!("Upcoming events:\n{}", lines)
    }

    /// Prompt asking the model for a daily summary email
    pub fn daily_reminder_prompt(&self, events: &[Event]) -> String {
        let list = if events.is_empty() {
            "- No events scheduled\n".to_string()
        } else {
            self.event_lines(events)
        };
        format!(
            "Generate a friendly daily reminder email for the following upcoming events:\n\n\
             {}\n\
             Make it professional but warm, and include any relevant tips for the day.\n\
             Respond with the email body only.",
            list
        )
    }

    /// Prompt asking the model to write an email body
    pub fn email_body_prompt(&self, subject: &str) -> String {
        format!(
            "Generate a professional email body for subject: {}\n\
             Respond with the email body only, without a subject line.",
            subject
        )
    }

    pub fn meeting_reminder_subject(&self, event: &Event, minutes: i64) -> String {
        format!("Reminder: {} starts in {} minutes", event.title(), minutes)
    }

    /// HTML body of the pre-meeting reminder
    pub fn meeting_reminder_body(&self, event: &Event) -> String {
        format!(
            "<h2>Upcoming Meeting</h2>\n\
             <p><strong>Title:</strong> {}</p>\n\
             <p><strong>Time:</strong> {}</p>\n\
             <p><strong>Attendees:</strong> {}</p>\n",
            escape_html(event.title()),
            self.long_time(event.start_time()),
            escape_html(&event.attendees().join(", ")),
        )
    }

    /// Secondary warning for confirmations that could not be delivered
    pub fn notification_warning(&self, outcome: &OperationOutcome) -> Option<String> {
        if outcome.failed.is_empty() {
            return None;
        }
        let details = outcome
            .failed
            .iter()
            .map(|(recipient, error)| format!("{} ({})", recipient, error))
            .collect::<Vec<_>>()
            .join("; ");
        Some(format!(
            "{} of {} confirmation email(s) failed: {}",
            outcome.failed.len(),
            outcome.attempted(),
            details
        ))
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
