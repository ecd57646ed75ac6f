//! Recording fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use exec_assistant::{
    AssistantIdentity, Capabilities, CalendarCapability, Composer, Event, LanguageModelCapability,
    NotificationCapability, Orchestrator, UpstreamError,
};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

pub const OPERATOR: &str = "me@corp.com";

pub fn identity() -> AssistantIdentity {
    AssistantIdentity::new(OPERATOR, "assistant@corp.com", "Assistant")
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

/// A recorded `schedule` call
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCall {
    pub attendees: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
}

/// Calendar that records writes and serves fixed events
#[derive(Default)]
pub struct FakeCalendar {
    pub scheduled: Mutex<Vec<ScheduledCall>>,
    pub events: Mutex<Vec<Event>>,
    pub upcoming_calls: Mutex<usize>,
    pub fail: bool,
}

impl FakeCalendar {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.scheduled.lock().unwrap().len() + *self.upcoming_calls.lock().unwrap()
    }
}

#[async_trait]
impl CalendarCapability for FakeCalendar {
    fn name(&self) -> &'static str {
        "fake-calendar"
    }

    async fn schedule(
        &self,
        attendees: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: &str,
    ) -> Result<(), UpstreamError> {
        self.scheduled.lock().unwrap().push(ScheduledCall {
            attendees: attendees.to_vec(),
            start,
            end,
            title: title.to_string(),
        });
        if self.fail {
            return Err(UpstreamError::Status {
                provider: "fake-calendar",
                status: 503,
                body: "calendar down".to_string(),
            });
        }
        Ok(())
    }

    async fn upcoming(&self) -> Result<Vec<Event>, UpstreamError> {
        *self.upcoming_calls.lock().unwrap() += 1;
        if self.fail {
            return Err(UpstreamError::Status {
                provider: "fake-calendar",
                status: 503,
                body: "calendar down".to_string(),
            });
        }
        Ok(self.events.lock().unwrap().clone())
    }
}

/// A recorded send
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer that records sends and fails for chosen recipients
#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub failing: HashSet<String>,
}

impl FakeMailer {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        let mut to: Vec<String> = self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect();
        to.sort();
        to
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationCapability for FakeMailer {
    fn name(&self) -> &'static str {
        "fake-mailer"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), UpstreamError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.failing.contains(to) {
            return Err(UpstreamError::Status {
                provider: "fake-mailer",
                status: 550,
                body: format!("mailbox {} unavailable", to),
            });
        }
        Ok(())
    }
}

/// Model that replays scripted replies in order
#[derive(Default)]
pub struct ScriptedModel {
    pub replies: Mutex<VecDeque<Result<String, UpstreamError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(UpstreamError::Status {
                provider: "scripted",
                status: 429,
                body: "quota exceeded".to_string(),
            })])),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModelCapability for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(UpstreamError::Empty { provider: "scripted" }))
    }
}

/// Fakes plus the orchestrator built from them
pub struct Harness {
    pub calendar: Arc<FakeCalendar>,
    pub mailer: Arc<FakeMailer>,
    pub model: Arc<ScriptedModel>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    pub fn new(calendar: FakeCalendar, mailer: FakeMailer, model: ScriptedModel) -> Self {
        let calendar = Arc::new(calendar);
        let mailer = Arc::new(mailer);
        let model = Arc::new(model);
        let orchestrator = Orchestrator::new(
            Capabilities::new(calendar.clone(), mailer.clone(), model.clone()),
            identity(),
            Composer::default(),
        );
        Self {
            calendar,
            mailer,
            model,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn healthy() -> Self {
        Self::new(FakeCalendar::default(), FakeMailer::default(), ScriptedModel::default())
    }
}

pub fn event(title: &str, start: &str, attendees: &[&str]) -> Event {
    let start = at(start);
    Event::new(title, strings(attendees), start, start + Duration::minutes(30)).unwrap()
}
