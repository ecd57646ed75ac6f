//! Google Calendar adapter
//!
//! REST v3 with an API key. Lists the next seven days of single events in
//! start order and creates events with invitations sent to every attendee.

use super::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const PROVIDER: &str = "google-calendar";
const CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3/calendars";
const LOOKAHEAD_DAYS: i64 = 7;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest<'a> {
    summary: &'a str,
    start: EventTimeRequest,
    end: EventTimeRequest,
    attendees: Vec<AttendeeRef<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTimeRequest {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct AttendeeRef<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    summary: String,
    start: Option<EventTime>,
    end: Option<EventTime>,
    #[serde(default)]
    attendees: Vec<Attendee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Attendee {
    email: Option<String>,
}

/// Google Calendar client
#[derive(Clone)]
pub struct GoogleCalendar {
    client: Client,
    api_key: String,
    calendar_id: String,
    timezone: Tz,
}

impl GoogleCalendar {
    pub fn new(client: Client, api_key: &str, calendar_id: &str, timezone: Tz) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            calendar_id: calendar_id.to_string(),
            timezone,
        }
    }

    fn events_url(&self) -> String {
        format!("{}/{}/events", CALENDAR_API_URL, self.calendar_id)
    }

    /// Resolve a provider time; all-day entries land on local midnight
    fn resolve_time(&self, time: &EventTime) -> Option<DateTime<Utc>> {
        if let Some(dt) = &time.date_time {
            return DateTime::parse_from_rfc3339(dt).ok().map(|t| t.with_timezone(&Utc));
        }
        let date = NaiveDate::parse_from_str(time.date.as_deref()?, "%Y-%m-%d").ok()?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        self.timezone
            .from_local_datetime(&midnight)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    }

    fn convert(&self, items: Vec<EventItem>) -> Vec<Event> {
        items
            .into_iter()
            .filter_map(|item| {
                let start = item.start.as_ref().and_then(|t| self.resolve_time(t));
                let end = item.end.as_ref().and_then(|t| self.resolve_time(t));
                let (Some(start), Some(end)) = (start, end) else {
                    warn!(title = %item.summary, "Skipping event with undecodable times");
                    return None;
                };
                let attendees = item.attendees.into_iter().filter_map(|a| a.email).collect();
                match Event::new(&item.summary, attendees, start, end) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!("Skipping event: {}", e);
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl CalendarCapability for GoogleCalendar {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn schedule(
        &self,
        attendees: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: &str,
    ) -> Result<(), UpstreamError> {
        let tz_name = self.timezone.name().to_string();
        let request = EventRequest {
            summary: title,
            start: EventTimeRequest {
                date_time: start.with_timezone(&self.timezone).to_rfc3339(),
                time_zone: tz_name.clone(),
            },
            end: EventTimeRequest {
                date_time: end.with_timezone(&self.timezone).to_rfc3339(),
                time_zone: tz_name,
            },
            attendees: attendees.iter().map(|email| AttendeeRef { email }).collect(),
        };

        debug!(title, attendees = attendees.len(), "Creating calendar event");

        let response = self
            .client
            .post(self.events_url())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("sendUpdates", "all")])
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::request(PROVIDER, e))?;

        if !response.status().is_success() {
            let err = UpstreamError::from_response(PROVIDER, response).await;
            warn!("Calendar insert failed: {}", err);
            return Err(err);
        }

        info!(title, "Calendar event created");
        Ok(())
    }

    async fn upcoming(&self) -> Result<Vec<Event>, UpstreamError> {
        let now = Utc::now();
        let time_min = now.to_rfc3339();
        let time_max = (now + Duration::days(LOOKAHEAD_DAYS)).to_rfc3339();

        let response = self
            .client
            .get(self.events_url())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::request(PROVIDER, e))?;

        if !response.status().is_success() {
            let err = UpstreamError::from_response(PROVIDER, response).await;
            warn!("Calendar list failed: {}", err);
            return Err(err);
        }

        let list: EventList = response
            .json()
            .await
            .map_err(|e| UpstreamError::body(PROVIDER, e))?;

        let events = self.convert(list.items);
        info!(count = events.len(), "Fetched upcoming events");
        Ok(events)
    }
}
