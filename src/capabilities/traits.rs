//! Capability Trait Definitions
//!
//! Narrow interfaces for the three external services the assistant drives.
//! The orchestrator only ever sees these traits; which provider backs them is
//! decided once at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Failure reported by a capability's backing provider
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpstreamError {
    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned an empty response")]
    Empty { provider: &'static str },

    #[error("{provider} rejected the message: {message}")]
    Rejected {
        provider: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn transport(provider: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider,
            message: err.to_string(),
        }
    }

    pub fn decode(provider: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            provider,
            message: err.to_string(),
        }
    }

    /// A reqwest send failure, without the request URL
    pub(crate) fn request(provider: &'static str, err: reqwest::Error) -> Self {
        Self::transport(provider, err.without_url())
    }

    /// A reqwest body decode failure, without the request URL
    pub(crate) fn body(provider: &'static str, err: reqwest::Error) -> Self {
        Self::decode(provider, err.without_url())
    }

    /// Which provider failed
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::Empty { provider }
            | Self::Rejected { provider, .. } => provider,
        }
    }

    /// Map a non-success HTTP response into an error, keeping a bounded body excerpt
    pub(crate) async fn from_response(provider: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > 512 {
            let cut = (0..=512).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
            body.truncate(cut);
        }
        Self::Status {
            provider,
            status,
            body,
        }
    }
}

/// Error building an [`Event`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("event '{title}' ends at {end} which is not after its start {start}")]
pub struct InvalidEventTimes {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A calendar entry as reported by the calendar provider.
///
/// Read-only to the rest of the crate; `end > start` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    title: String,
    attendees: Vec<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl Event {
    pub fn new(
        title: &str,
        attendees: Vec<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, InvalidEventTimes> {
        if end_time <= start_time {
            return Err(InvalidEventTimes {
                title: title.to_string(),
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            title: title.to_string(),
            attendees,
            start_time,
            end_time,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn attendees(&self) -> &[String] {
        &self.attendees
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }
}

/// Calendar provider operations
#[async_trait]
pub trait CalendarCapability: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Create a meeting with the given attendees
    async fn schedule(
        &self,
        attendees: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: &str,
    ) -> Result<(), UpstreamError>;

    /// Upcoming events, ascending by start time
    async fn upcoming(&self) -> Result<Vec<Event>, UpstreamError>;
}

/// Outbound email
#[async_trait]
pub trait NotificationCapability: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send one email to one recipient. `body` may contain HTML.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), UpstreamError>;
}

/// Text completion
#[async_trait]
pub trait LanguageModelCapability: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_request_error_omits_url_credentials() {
        // nothing listens on port 1, so the send fails fast
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/v1/models?key=SECRETKEY123")
            .send()
            .await
            .unwrap_err();

        let message = UpstreamError::request("gemini", err).to_string();
        assert!(message.starts_with("gemini request failed"));
        assert!(!message.contains("SECRETKEY123"));
        assert!(!message.contains("127.0.0.1:1"));
    }

    #[test]
    fn test_event_requires_end_after_start() {
        let start = Utc::now();
        assert!(Event::new("Sync", vec![], start, start + Duration::minutes(30)).is_ok());

        let err = Event::new("Sync", vec![], start, start).unwrap_err();
        assert_eq!(err.title, "Sync");
        assert!(Event::new("Sync", vec![], start, start - Duration::minutes(1)).is_err());
    }

    #[test]
    fn test_event_serializes_snake_case() {
        let start = DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z").unwrap().with_timezone(&Utc);
        let event = Event::new(
            "Planning",
            vec!["a@b.com".to_string()],
            start,
            start + Duration::hours(1),
        )
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["title"], "Planning");
        assert_eq!(json["attendees"][0], "a@b.com");
        assert_eq!(json["start_time"], "2024-01-15T10:00:00Z");
        assert_eq!(json["end_time"], "2024-01-15T11:00:00Z");
    }

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::Status {
            provider: "sendgrid",
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "sendgrid returned status 401: unauthorized");
        assert_eq!(err.provider(), "sendgrid");
    }
}
