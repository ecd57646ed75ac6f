//! Background Reminders
//!
//! Periodic task that runs while the server is up:
//! - Daily reminder: once per local day, shortly after the configured time
//! - Meeting reminders: attendees of events starting within the lead time
//!   get one "starts in N minutes" email per event
//!
//! Every send goes through the orchestrator, so fan-out failures stay
//! isolated per recipient exactly like confirmations.

use crate::capabilities::Event;
use crate::config::Config;
use crate::orchestrator::Orchestrator;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// How long after the configured time a missed daily reminder still goes out
const DAILY_WINDOW_MINUTES: i64 = 60;

/// Configuration for the reminder scheduler
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Local time-of-day of the daily reminder
    pub daily_time: NaiveTime,
    /// Lead time for meeting reminders
    pub meeting_lead_minutes: u32,
    /// Zone the daily time is expressed in
    pub timezone: Tz,
    /// Interval between checks
    pub tick: Duration,
    pub enabled: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            daily_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            meeting_lead_minutes: 15,
            timezone: Tz::UTC,
            tick: Duration::from_secs(60),
            enabled: false,
        }
    }
}

impl ReminderConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            daily_time: config.daily_reminder_time,
            meeting_lead_minutes: config.meeting_reminder_minutes,
            timezone: config.timezone,
            enabled: config.reminders_enabled,
            ..Default::default()
        }
    }
}

/// Reminder task types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderTask {
    DailyReminder,
    MeetingReminder,
}

impl ReminderTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderTask::DailyReminder => "daily_reminder",
            ReminderTask::MeetingReminder => "meeting_reminder",
        }
    }
}

/// Counters for the scheduler
#[derive(Debug, Default)]
pub struct ReminderStats {
    pub daily_sent: AtomicU64,
    pub meeting_reminders_sent: AtomicU64,
    pub failures: AtomicU64,
}

/// Identity of an event for once-only reminders
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EventKey {
    title: String,
    start: DateTime<Utc>,
}

impl From<&Event> for EventKey {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title().to_string(),
            start: event.start_time(),
        }
    }
}

/// Background reminder scheduler
pub struct ReminderScheduler {
    config: ReminderConfig,
    orchestrator: Arc<Orchestrator>,
    stats: Arc<ReminderStats>,
    last_daily: Mutex<Option<NaiveDate>>,
    reminded: Mutex<HashSet<EventKey>>,
}

impl ReminderScheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, config: ReminderConfig) -> Self {
        Self {
            config,
            orchestrator,
            stats: Arc::new(ReminderStats::default()),
            last_daily: Mutex::new(None),
            reminded: Mutex::new(HashSet::new()),
        }
    }

    pub fn stats(&self) -> Arc<ReminderStats> {
        self.stats.clone()
    }

    /// Run a single check at `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> Vec<(ReminderTask, usize)> {
        let mut results = Vec::new();

        if self.daily_due(now).await {
            let sent = match self.orchestrator.send_daily_reminder().await {
                Ok(_) => {
                    self.stats.daily_sent.fetch_add(1, Ordering::Relaxed);
                    1
                }
                Err(e) => {
                    warn!("Daily reminder failed: {}", e);
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    0
                }
            };
            results.push((ReminderTask::DailyReminder, sent));
        }

        let sent = self.send_meeting_reminders(now).await;
        if sent > 0 {
            results.push((ReminderTask::MeetingReminder, sent));
        }

        results
    }

    /// True at most once per local day, inside the window after the daily time.
    /// The window may run past midnight; it belongs to the day it opened on.
    /// Claims the day, so a failed attempt is not retried until tomorrow.
    async fn daily_due(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.config.timezone).naive_local();
        let mut slot = local.date().and_time(self.config.daily_time);
        if slot > local {
            slot -= ChronoDuration::days(1);
        }
        if local - slot >= ChronoDuration::minutes(DAILY_WINDOW_MINUTES) {
            return false;
        }

        let day = slot.date();
        let mut last = self.last_daily.lock().await;
        if *last == Some(day) {
            return false;
        }
        *last = Some(day);
        true
    }

    /// Remind attendees of events starting within the lead time; returns emails delivered
    async fn send_meeting_reminders(&self, now: DateTime<Utc>) -> usize {
        let lead = ChronoDuration::minutes(i64::from(self.config.meeting_lead_minutes));
        if lead <= ChronoDuration::zero() {
            return 0;
        }

        let events = match self.orchestrator.list_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Meeting reminder check failed: {}", e);
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                return 0;
            }
        };

        let mut reminded = self.reminded.lock().await;
        reminded.retain(|key| key.start > now);

        let mut delivered = 0;
        for event in &events {
            let until = event.start_time() - now;
            if until <= ChronoDuration::zero() || until > lead {
                continue;
            }
            if !reminded.insert(EventKey::from(event)) {
                continue;
            }

            // round up so "starts in 0 minutes" never goes out
            let minutes = (until.num_seconds() + 59) / 60;
            let outcome = self.orchestrator.send_meeting_reminder(event, minutes).await;
            debug!(
                title = event.title(),
                sent = outcome.succeeded.len(),
                failed = outcome.failed.len(),
                "Meeting reminder fan-out finished"
            );
            delivered += outcome.succeeded.len();
            self.stats
                .meeting_reminders_sent
                .fetch_add(outcome.succeeded.len() as u64, Ordering::Relaxed);
            self.stats
                .failures
                .fetch_add(outcome.failed.len() as u64, Ordering::Relaxed);
        }
        delivered
    }

    /// Tick until shutdown is signalled
    pub async fn run_continuous(self: Arc<Self>, shutdown: tokio::sync::watch::Receiver<bool>) {
        if !self.config.enabled {
            info!("Reminder scheduler disabled");
            return;
        }

        info!(
            daily_time = %self.config.daily_time.format("%H:%M"),
            lead_minutes = self.config.meeting_lead_minutes,
            "Starting reminder scheduler"
        );
        let mut interval = interval(self.config.tick);

        let mut shutdown = shutdown;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for (task, count) in self.run_once(Utc::now()).await {
                        info!(task = task.as_str(), count, "Reminder task ran");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Reminder scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{
        Capabilities, CalendarCapability, DemoModel, NotificationCapability, UpstreamError,
    };
    use crate::composer::Composer;
    use crate::config::AssistantIdentity;
    use async_trait::async_trait;

    const OPERATOR: &str = "me@corp.com";

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    struct FixedCalendar {
        events: Vec<Event>,
    }

    #[async_trait]
    impl CalendarCapability for FixedCalendar {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn schedule(
            &self,
            _attendees: &[String],
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _title: &str,
        ) -> Result<(), UpstreamError> {
            Ok(())
        }

        async fn upcoming(&self) -> Result<Vec<Event>, UpstreamError> {
            Ok(self.events.clone())
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: std::sync::Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationCapability for Outbox {
        fn name(&self) -> &'static str {
            "outbox"
        }

        async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), UpstreamError> {
            self.sent.lock().unwrap().push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    fn scheduler(events: Vec<Event>, outbox: Arc<Outbox>) -> ReminderScheduler {
        scheduler_with(
            events,
            outbox,
            ReminderConfig {
                enabled: true,
                ..Default::default()
            },
        )
    }

    fn scheduler_with(events: Vec<Event>, outbox: Arc<Outbox>, config: ReminderConfig) -> ReminderScheduler {
        let orchestrator = Orchestrator::new(
            Capabilities::new(
                Arc::new(FixedCalendar { events }),
                outbox,
                Arc::new(DemoModel::new()),
            ),
            AssistantIdentity::new(OPERATOR, "assistant@corp.com", "Assistant"),
            Composer::default(),
        );
        ReminderScheduler::new(Arc::new(orchestrator), config)
    }

    fn standup() -> Event {
        Event::new(
            "Standup",
            vec!["a@b.com".to_string(), OPERATOR.to_string()],
            at("2024-01-15T14:00:00Z"),
            at("2024-01-15T14:15:00Z"),
        )
        .unwrap()
    }

    #[test]
    fn test_task_names() {
        assert_eq!(ReminderTask::DailyReminder.as_str(), "daily_reminder");
        assert_eq!(ReminderTask::MeetingReminder.as_str(), "meeting_reminder");
    }

    #[tokio::test]
    async fn test_daily_reminder_once_per_day() {
        let outbox = Arc::new(Outbox::default());
        let scheduler = scheduler(Vec::new(), outbox.clone());

        assert!(scheduler.run_once(at("2024-01-15T08:59:00Z")).await.is_empty());
        assert_eq!(
            scheduler.run_once(at("2024-01-15T09:00:30Z")).await,
            vec![(ReminderTask::DailyReminder, 1)]
        );
        assert!(scheduler.run_once(at("2024-01-15T09:01:30Z")).await.is_empty());
        assert!(scheduler.run_once(at("2024-01-15T11:00:00Z")).await.is_empty());
        assert_eq!(
            scheduler.run_once(at("2024-01-16T09:05:00Z")).await,
            vec![(ReminderTask::DailyReminder, 1)]
        );

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(to, _)| to == OPERATOR));
    }

    #[tokio::test]
    async fn test_daily_window_wraps_midnight() {
        let outbox = Arc::new(Outbox::default());
        let scheduler = scheduler_with(
            Vec::new(),
            outbox.clone(),
            ReminderConfig {
                enabled: true,
                daily_time: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
                ..Default::default()
            },
        );

        // opened on the 15th, still open 40 minutes later on the 16th
        assert_eq!(
            scheduler.run_once(at("2024-01-16T00:10:00Z")).await,
            vec![(ReminderTask::DailyReminder, 1)]
        );
        // the 15th is claimed; the window has closed by 00:30
        assert!(scheduler.run_once(at("2024-01-16T00:20:00Z")).await.is_empty());
        assert!(scheduler.run_once(at("2024-01-16T00:30:00Z")).await.is_empty());
        assert!(scheduler.run_once(at("2024-01-16T23:00:00Z")).await.is_empty());
        assert_eq!(
            scheduler.run_once(at("2024-01-16T23:30:00Z")).await,
            vec![(ReminderTask::DailyReminder, 1)]
        );
        assert_eq!(outbox.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_meeting_reminder_once_per_event() {
        let outbox = Arc::new(Outbox::default());
        let scheduler = scheduler(vec![standup()], outbox.clone());

        // 20 minutes out: not yet
        assert!(scheduler.run_once(at("2024-01-15T13:40:00Z")).await.is_empty());
        assert_eq!(
            scheduler.run_once(at("2024-01-15T13:50:00Z")).await,
            vec![(ReminderTask::MeetingReminder, 1)]
        );
        assert!(scheduler.run_once(at("2024-01-15T13:55:00Z")).await.is_empty());

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![(
                "a@b.com".to_string(),
                "Reminder: Standup starts in 10 minutes".to_string()
            )]
        );
        assert_eq!(scheduler.stats().meeting_reminders_sent.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_returns_immediately() {
        let outbox = Arc::new(Outbox::default());
        let mut scheduler = scheduler(Vec::new(), outbox);
        scheduler.config.enabled = false;
        let (_tx, rx) = tokio::sync::watch::channel(false);
        Arc::new(scheduler).run_continuous(rx).await;
    }
}
