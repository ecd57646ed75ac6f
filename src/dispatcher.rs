//! Action Dispatcher
//!
//! Routes each resolved [`Action`] to exactly one orchestrator routine and
//! renders the user-facing reply.

use crate::action::{Action, EmailRequest, MeetingRequest};
use crate::intent::IntentError;
use crate::orchestrator::{OperationOutcome, Orchestrator, OrchestratorError};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub const NOT_UNDERSTOOD: &str = "Sorry, I couldn't understand that command. \
Try asking me to schedule a meeting, send an email, list your upcoming events, \
or send your daily reminder.";

/// Reply to a command: `{result, error?, notifications?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReply {
    pub result: String,
    /// Secondary warning; the primary operation still succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<OperationOutcome>,
}

impl CommandReply {
    pub fn text(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            error: None,
            notifications: None,
        }
    }

    /// Reply for a command that did not resolve to an action
    pub fn not_understood(err: &IntentError) -> Self {
        match err {
            IntentError::Malformed {
                intended, reason, ..
            } => Self::text(format!(
                "It looks like you want to {}, but I couldn't read the details ({}). \
                 Please rephrase with the missing information.",
                intended.describe(),
                reason
            )),
            _ => Self::text(NOT_UNDERSTOOD),
        }
    }
}

/// Dispatcher over a shared orchestrator
#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Arc<Orchestrator>,
}

impl Dispatcher {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Run the one routine an action maps to
    pub async fn dispatch(&self, action: Action) -> Result<CommandReply, OrchestratorError> {
        if let Some(kind) = action.kind() {
            info!(action = %kind, "Dispatching action");
        }
        match action {
            Action::ScheduleMeeting(request) => self.schedule_meeting(request).await,
            Action::SendEmail(request) => self.send_email(request).await,
            Action::ListEvents => self.list_events().await,
            Action::SendDailyReminder => self.send_daily_reminder().await,
            Action::Unrecognized { action } => {
                info!(action = %action, "Unrecognized action, nothing executed");
                Ok(CommandReply::text(NOT_UNDERSTOOD))
            }
        }
    }

    pub async fn schedule_meeting(
        &self,
        request: MeetingRequest,
    ) -> Result<CommandReply, OrchestratorError> {
        let scheduled = self.orchestrator.schedule_meeting(request).await?;
        let composer = self.orchestrator.composer();

        Ok(CommandReply {
            result: format!(
                "Meeting \"{}\" scheduled for {} with {} attendee(s).",
                scheduled.title,
                composer.long_time(scheduled.start),
                scheduled.attendees.len()
            ),
            error: composer.notification_warning(&scheduled.notifications),
            notifications: Some(scheduled.notifications),
        })
    }

    pub async fn send_email(&self, request: EmailRequest) -> Result<CommandReply, OrchestratorError> {
        let sent = self.orchestrator.send_email(request).await?;
        Ok(CommandReply::text(format!("Email sent to {}.", sent.to)))
    }

    pub async fn list_events(&self) -> Result<CommandReply, OrchestratorError> {
        let events = self.orchestrator.list_events().await?;
        Ok(CommandReply::text(
            self.orchestrator.composer().events_listing(&events),
        ))
    }

    pub async fn send_daily_reminder(&self) -> Result<CommandReply, OrchestratorError> {
        let sent = self.orchestrator.send_daily_reminder().await?;
        Ok(CommandReply::text(format!(
            "Daily reminder covering {} event(s) sent to {}.",
            sent.event_count, sent.to
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionError, ActionKind};
    use crate::capabilities::{
        Capabilities, CalendarCapability, Event, LanguageModelCapability, NotificationCapability,
        UpstreamError,
    };
    use crate::composer::Composer;
    use crate::config::AssistantIdentity;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts every capability call
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Counting {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CalendarCapability for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn schedule(
            &self,
            _attendees: &[String],
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _title: &str,
        ) -> Result<(), UpstreamError> {
            self.hit();
            Ok(())
        }

        async fn upcoming(&self) -> Result<Vec<Event>, UpstreamError> {
            self.hit();
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl NotificationCapability for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), UpstreamError> {
            self.hit();
            Ok(())
        }
    }

    #[async_trait]
    impl LanguageModelCapability for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, UpstreamError> {
            self.hit();
            Ok("summary".to_string())
        }
    }

    fn dispatcher(counter: Arc<Counting>) -> Dispatcher {
        let orchestrator = Orchestrator::new(
            Capabilities::new(counter.clone(), counter.clone(), counter),
            AssistantIdentity::new("me@corp.com", "assistant@corp.com", "Assistant"),
            Composer::default(),
        );
        Dispatcher::new(Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn test_unrecognized_touches_nothing() {
        let counter = Arc::new(Counting::default());
        let reply = dispatcher(counter.clone())
            .dispatch(Action::Unrecognized {
                action: "book_flight".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(reply.result, NOT_UNDERSTOOD);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_events_single_call() {
        let counter = Arc::new(Counting::default());
        let reply = dispatcher(counter.clone()).dispatch(Action::ListEvents).await.unwrap();
        assert_eq!(reply.result, "You have no upcoming events.");
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_schedule_reply_reports_notifications() {
        let counter = Arc::new(Counting::default());
        let request = MeetingRequest::parse(
            vec!["x@y.com".to_string()],
            "2024-01-15T10:00:00Z",
            30,
            "Sync",
        )
        .unwrap();
        let reply = dispatcher(counter.clone())
            .dispatch(Action::ScheduleMeeting(request))
            .await
            .unwrap();

        assert!(reply.result.contains("\"Sync\""));
        assert!(reply.result.contains("2 attendee(s)"));
        assert!(reply.error.is_none());
        assert_eq!(reply.notifications.unwrap().succeeded.len(), 1);
        // one calendar write, one confirmation
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_not_understood_names_intended_action() {
        let reply = CommandReply::not_understood(&IntentError::Malformed {
            intended: ActionKind::SendEmail,
            raw: "{}".to_string(),
            reason: ActionError::MissingField { field: "subject" },
        });
        assert!(reply.result.contains("send an email"));
        assert!(reply.result.contains("missing subject"));

        let reply = CommandReply::not_understood(&IntentError::Unparseable {
            raw: "hmm".to_string(),
        });
        assert_eq!(reply.result, NOT_UNDERSTOOD);
    }

    #[test]
    fn test_reply_omits_empty_fields() {
        let json = serde_json::to_value(CommandReply::text("done")).unwrap();
        assert_eq!(json, serde_json::json!({"result": "done"}));
    }
}
