//! Command Orchestrator
//!
//! Owns every business rule of the assistant:
//! - attendee normalization (operator always present exactly once)
//! - meeting scheduling followed by a confirmation fan-out
//! - email sending with generated bodies
//! - event listing and the daily reminder
//!
//! Capabilities are injected at construction; the orchestrator holds no
//! mutable state and is shared across requests behind an `Arc`.

use crate::action::{EmailRequest, MeetingRequest};
use crate::capabilities::{
    Capabilities, CalendarCapability, Event, LanguageModelCapability, NotificationCapability,
    UpstreamError,
};
use crate::composer::{Composer, DAILY_REMINDER_SUBJECT};
use crate::config::AssistantIdentity;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Default bound on concurrent confirmation sends
const DEFAULT_MAX_CONCURRENT_SENDS: usize = 8;

/// Failure of the primary operation of a request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Failed to schedule meeting: {0}")]
    Scheduling(UpstreamError),

    #[error("Failed to fetch events: {0}")]
    EventFetch(UpstreamError),

    #[error("Failed to generate content: {0}")]
    Generation(UpstreamError),

    #[error("Failed to send email: {0}")]
    Delivery(UpstreamError),
}

impl OrchestratorError {
    pub fn upstream(&self) -> &UpstreamError {
        match self {
            Self::Scheduling(e) | Self::EventFetch(e) | Self::Generation(e) | Self::Delivery(e) => e,
        }
    }
}

/// Per-recipient result of a multi-recipient send.
///
/// Only describes the fan-out; a failed primary operation is reported as an
/// [`OrchestratorError`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeMap<String, String>,
}

impl OperationOutcome {
    pub fn record_success(&mut self, recipient: &str) {
        self.succeeded.insert(recipient.to_string());
    }

    pub fn record_failure(&mut self, recipient: &str, error: impl ToString) {
        self.failed.insert(recipient.to_string(), error.to_string());
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of a successful scheduling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingScheduled {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Normalized attendee list as sent to the calendar
    pub attendees: Vec<String>,
    /// Confirmation fan-out (operator excluded)
    pub notifications: OperationOutcome,
}

/// Result of a successful single email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSent {
    pub to: String,
    pub subject: String,
    pub generated_body: bool,
}

/// Result of a successful daily reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSent {
    pub to: String,
    pub event_count: usize,
}

/// Deduplicate (exact match, first occurrence wins) and make sure the operator
/// appears exactly once. Existing entries keep their relative order; the
/// operator is appended when absent.
pub fn normalize_attendees(attendees: &[String], operator: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized: Vec<String> = attendees
        .iter()
        .filter(|a| seen.insert(a.as_str()))
        .cloned()
        .collect();

    if !normalized.iter().any(|a| a == operator) {
        normalized.push(operator.to_string());
    }
    normalized
}

/// The orchestrator
pub struct Orchestrator {
    calendar: Arc<dyn CalendarCapability>,
    notifier: Arc<dyn NotificationCapability>,
    model: Arc<dyn LanguageModelCapability>,
    identity: AssistantIdentity,
    composer: Composer,
    max_concurrent_sends: usize,
}

impl Orchestrator {
    pub fn new(capabilities: Capabilities, identity: AssistantIdentity, composer: Composer) -> Self {
        Self {
            calendar: capabilities.calendar,
            notifier: capabilities.notifier,
            model: capabilities.model,
            identity,
            composer,
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
        }
    }

    /// Bound on concurrent confirmation sends (minimum 1 = sequential)
    pub fn with_max_concurrent_sends(mut self, limit: usize) -> Self {
        self.max_concurrent_sends = limit.max(1);
        self
    }

    pub fn identity(&self) -> &AssistantIdentity {
        &self.identity
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// The language model, for the intent resolver
    pub fn model(&self) -> Arc<dyn LanguageModelCapability> {
        self.model.clone()
    }

    /// Schedule a meeting and confirm it to every attendee except the operator.
    ///
    /// A calendar failure aborts before any email is attempted. Confirmation
    /// failures never fail the operation; they are itemized in the outcome.
    pub async fn schedule_meeting(
        &self,
        request: MeetingRequest,
    ) -> Result<MeetingScheduled, OrchestratorError> {
        let attendees = normalize_attendees(&request.attendees, &self.identity.operator_email);
        let end = request.end();

        info!(
            title = %request.title,
            attendees = ?attendees,
            start = %request.start.to_rfc3339(),
            "Scheduling meeting"
        );

        if let Err(e) = self
            .calendar
            .schedule(&attendees, request.start, end, &request.title)
            .await
        {
            warn!(title = %request.title, "Failed to schedule meeting: {}", e);
            return Err(OrchestratorError::Scheduling(e));
        }

        let subject = self.composer.confirmation_subject(&request.title);
        let body = self.composer.confirmation_body(
            &request.title,
            request.start,
            request.duration_minutes,
            &attendees,
        );
        let recipients = self.non_operator(&attendees);

        let notifications = self.fan_out(recipients, &subject, &body).await;

        if notifications.all_succeeded() {
            info!(title = %request.title, sent = notifications.succeeded.len(), "Meeting scheduled and confirmed");
        } else {
            warn!(
                title = %request.title,
                sent = notifications.succeeded.len(),
                failed = notifications.failed.len(),
                "Meeting scheduled; some confirmations failed"
            );
        }

        Ok(MeetingScheduled {
            title: request.title,
            start: request.start,
            end,
            attendees,
            notifications,
        })
    }

    /// Send one email, generating the body first when none was given.
    ///
    /// A generation failure is fatal: nothing is sent.
    pub async fn send_email(&self, request: EmailRequest) -> Result<EmailSent, OrchestratorError> {
        info!(to = %request.to, subject = %request.subject, "Sending email");

        let (body, generated_body) = match request.body {
            Some(body) => (body, false),
            None => {
                let prompt = self.composer.email_body_prompt(&request.subject);
                let body = self.model.complete(&prompt).await.map_err(|e| {
                    warn!(subject = %request.subject, "Failed to generate email body: {}", e);
                    OrchestratorError::Generation(e)
                })?;
                (body, true)
            }
        };

        self.notifier
            .send(&request.to, &request.subject, &body)
            .await
            .map_err(OrchestratorError::Delivery)?;

        Ok(EmailSent {
            to: request.to,
            subject: request.subject,
            generated_body,
        })
    }

    /// Upcoming events exactly as the calendar orders them
    pub async fn list_events(&self) -> Result<Vec<Event>, OrchestratorError> {
        let events = self.calendar.upcoming().await.map_err(|e| {
            warn!("Failed to get upcoming events: {}", e);
            OrchestratorError::EventFetch(e)
        })?;
        info!(count = events.len(), "Retrieved upcoming events");
        Ok(events)
    }

    /// Summarize upcoming events through the model and mail the summary to the operator
    pub async fn send_daily_reminder(&self) -> Result<ReminderSent, OrchestratorError> {
        info!("Sending daily reminder");

        let events = self.list_events().await?;
        let prompt = self.composer.daily_reminder_prompt(&events);
        let summary = self.model.complete(&prompt).await.map_err(|e| {
            warn!("Failed to generate reminder content: {}", e);
            OrchestratorError::Generation(e)
        })?;

        let to = self.identity.operator_email.clone();
        self.notifier
            .send(&to, DAILY_REMINDER_SUBJECT, &summary)
            .await
            .map_err(|e| {
                warn!("Failed to send daily reminder: {}", e);
                OrchestratorError::Delivery(e)
            })?;

        info!(event_count = events.len(), "Daily reminder sent");
        Ok(ReminderSent {
            to,
            event_count: events.len(),
        })
    }

    /// Remind every non-operator attendee of an upcoming event
    pub async fn send_meeting_reminder(&self, event: &Event, minutes_until: i64) -> OperationOutcome {
        let subject = self.composer.meeting_reminder_subject(event, minutes_until);
        let body = self.composer.meeting_reminder_body(event);
        let attendees = normalize_attendees(event.attendees(), &self.identity.operator_email);
        let recipients = self.non_operator(&attendees);
        self.fan_out(recipients, &subject, &body).await
    }

    fn non_operator(&self, attendees: &[String]) -> Vec<String> {
        attendees
            .iter()
            .filter(|a| !self.identity.is_operator(a))
            .cloned()
            .collect()
    }

    /// Send the same message to each recipient independently.
    ///
    /// Every send is attempted; one failure never stops the others.
    async fn fan_out(&self, recipients: Vec<String>, subject: &str, body: &str) -> OperationOutcome {
        let subject: Arc<str> = Arc::from(subject);
        let body: Arc<str> = Arc::from(body);
        let results: Vec<(String, Result<(), UpstreamError>)> = stream::iter(recipients)
            .map(|recipient| {
                let notifier = Arc::clone(&self.notifier);
                let subject = Arc::clone(&subject);
                let body = Arc::clone(&body);
                async move {
                    let result = notifier.send(&recipient, &subject, &body).await;
                    (recipient, result)
                }
            })
            .buffer_unordered(self.max_concurrent_sends)
            .collect()
            .await;

        let mut outcome = OperationOutcome::default();
        for (recipient, result) in results {
            match result {
                Ok(()) => outcome.record_success(&recipient),
                Err(e) => {
                    warn!(attendee = %recipient, "Failed to send email: {}", e);
                    outcome.record_failure(&recipient, e);
                }
            }
        }
        outcome
    }
}
