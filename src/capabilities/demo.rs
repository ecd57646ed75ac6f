//! Demo adapters
//!
//! Used when the corresponding provider is not configured. They never fail,
//! so the HTTP surface stays explorable without any credentials.

use super::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

/// Calendar with two canned events relative to "now"
#[derive(Debug, Default, Clone)]
pub struct DemoCalendar;

impl DemoCalendar {
    pub fn new() -> Self {
        Self
    }

    fn canned_events(now: DateTime<Utc>) -> Vec<Event> {
        [
            ("Team Meeting", "team@example.com", 2),
            ("Client Call", "client@example.com", 24),
        ]
        .into_iter()
        .filter_map(|(title, attendee, hours)| {
            let start = now + Duration::hours(hours);
            Event::new(title, vec![attendee.to_string()], start, start + Duration::hours(1)).ok()
        })
        .collect()
    }
}

#[async_trait]
impl CalendarCapability for DemoCalendar {
    fn name(&self) -> &'static str {
        "demo-calendar"
    }

    async fn schedule(
        &self,
        attendees: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: &str,
    ) -> Result<(), UpstreamError> {
        info!(
            title,
            start = %start.to_rfc3339(),
            end = %end.to_rfc3339(),
            attendees = ?attendees,
            "Meeting would be scheduled (demo mode)"
        );
        Ok(())
    }

    async fn upcoming(&self) -> Result<Vec<Event>, UpstreamError> {
        let events = Self::canned_events(Utc::now());
        info!(count = events.len(), "Returning canned events (demo mode)");
        Ok(events)
    }
}

/// Mailer that only logs
#[derive(Debug, Default, Clone)]
pub struct DemoMailer;

impl DemoMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationCapability for DemoMailer {
    fn name(&self) -> &'static str {
        "demo-mailer"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), UpstreamError> {
        info!(to, subject, body_len = body.len(), "Email would be sent (demo mode)");
        Ok(())
    }
}

const DEMO_COMPLETION: &str = "This is a demo response. Set GEMINI_API_KEY or ANTHROPIC_API_KEY \
for real language model output.";

/// Model that answers every prompt with the same canned text
#[derive(Debug, Default, Clone)]
pub struct DemoModel;

impl DemoModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModelCapability for DemoModel {
    fn name(&self) -> &'static str {
        "demo-model"
    }

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        info!(prompt_len = prompt.len(), "Returning canned completion (demo mode)");
        Ok(DEMO_COMPLETION.to_string())
    }
}
