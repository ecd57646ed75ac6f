//! Configuration management
//!
//! Everything is read from the process environment (after an optional `.env`
//! has been loaded by the binary). Provider keys are all optional: with none of
//! them set the service runs in demo mode on canned adapters.

use chrono::NaiveTime;
use chrono_tz::Tz;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Keys shipped in sample `.env` files that must not count as real credentials
const PLACEHOLDER_MARKERS: &[&str] = &["your_", "_here", "changeme"];

/// Google Calendar keys shorter than this are treated as unusable
const MIN_CALENDAR_KEY_LEN: usize = 31;

/// Configuration errors, reported once at startup
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// The operator the assistant works for and the identity it sends as.
///
/// Immutable after startup and shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantIdentity {
    /// Operator's own address; always a meeting attendee, never a confirmation recipient
    pub operator_email: String,
    /// Envelope sender address
    pub from_email: String,
    /// Envelope sender display name
    pub from_name: String,
}

impl AssistantIdentity {
    pub fn new(operator_email: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            operator_email: operator_email.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    /// Is this address the operator?
    pub fn is_operator(&self, email: &str) -> bool {
        self.operator_email == email
    }
}

/// Provider credentials; `None` means the provider is not configured
#[derive(Clone, Default)]
pub struct ProviderKeys {
    pub google_calendar_api_key: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub gmail_app_password: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl std::fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(key: &Option<String>) -> &'static str {
            if key.is_some() { "<set>" } else { "<unset>" }
        }
        f.debug_struct("ProviderKeys")
            .field("google_calendar_api_key", &mask(&self.google_calendar_api_key))
            .field("sendgrid_api_key", &mask(&self.sendgrid_api_key))
            .field("gmail_app_password", &mask(&self.gmail_app_password))
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .field("anthropic_api_key", &mask(&self.anthropic_api_key))
            .finish()
    }
}

impl ProviderKeys {
    /// True when no provider is configured at all
    pub fn is_demo(&self) -> bool {
        self.google_calendar_api_key.is_none()
            && self.sendgrid_api_key.is_none()
            && self.gmail_app_password.is_none()
            && self.gemini_api_key.is_none()
            && self.anthropic_api_key.is_none()
    }

    /// Calendar key, if it looks like a real credential
    pub fn usable_calendar_key(&self) -> Option<&str> {
        self.google_calendar_api_key
            .as_deref()
            .filter(|key| key.len() >= MIN_CALENDAR_KEY_LEN && !is_placeholder(key))
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub keys: ProviderKeys,
    pub identity: AssistantIdentity,

    /// Calendar to read and write (Google calendar id)
    pub calendar_id: String,
    /// Gemini model id
    pub gemini_model: String,
    /// Claude model id; the client default when unset
    pub anthropic_model: Option<String>,
    /// SMTP relay host and port
    pub smtp_host: String,
    pub smtp_port: u16,

    /// HTTP bind address and port
    pub bind_addr: IpAddr,
    pub port: u16,

    /// Zone used to render local times and to write calendar events
    pub timezone: Tz,
    /// Local time of day of the daily reminder
    pub daily_reminder_time: NaiveTime,
    /// Lead time for per-meeting reminders
    pub meeting_reminder_minutes: u32,
    /// Run the background reminder scheduler
    pub reminders_enabled: bool,

    /// Per-request deadline and provider client timeout
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keys: ProviderKeys::default(),
            identity: AssistantIdentity::new(
                "user@example.com",
                "assistant@example.com",
                "AI Executive Assistant",
            ),
            calendar_id: "primary".to_string(),
            gemini_model: "gemini-1.5-flash-latest".to_string(),
            anthropic_model: None,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            timezone: Tz::UTC,
            daily_reminder_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            meeting_reminder_minutes: 15,
            reminders_enabled: false,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let keys = ProviderKeys {
            google_calendar_api_key: get("GOOGLE_CALENDAR_API_KEY"),
            sendgrid_api_key: get("SENDGRID_API_KEY"),
            gmail_app_password: get("GMAIL_APP_PASSWORD"),
            gemini_api_key: get("GEMINI_API_KEY"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
        };

        let identity = AssistantIdentity {
            operator_email: get("USER_EMAIL").unwrap_or(defaults.identity.operator_email),
            from_email: get("FROM_EMAIL").unwrap_or(defaults.identity.from_email),
            from_name: get("FROM_NAME").unwrap_or(defaults.identity.from_name),
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v.parse().map_err(|e: std::net::AddrParseError| invalid("BIND_ADDR", &v, e))?,
            None => defaults.bind_addr,
        };

        let port = parse_or("SERVER_PORT", get("SERVER_PORT"), defaults.port)?;
        let smtp_port = parse_or("SMTP_PORT", get("SMTP_PORT"), defaults.smtp_port)?;
        let meeting_reminder_minutes = parse_or(
            "MEETING_REMINDER_MINUTES",
            get("MEETING_REMINDER_MINUTES"),
            defaults.meeting_reminder_minutes,
        )?;
        let timeout_secs = parse_or(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            defaults.request_timeout.as_secs(),
        )?;

        let timezone = match get("TIMEZONE") {
            Some(v) => v.parse::<Tz>().map_err(|e| invalid("TIMEZONE", &v, e))?,
            None => defaults.timezone,
        };

        let daily_reminder_time = match get("DAILY_REMINDER_TIME") {
            Some(v) => NaiveTime::parse_from_str(&v, "%H:%M").map_err(|e| invalid("DAILY_REMINDER_TIME", &v, e))?,
            None => defaults.daily_reminder_time,
        };

        let reminders_enabled = get("REMINDER_SCHEDULER_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.reminders_enabled);

        Ok(Self {
            keys,
            identity,
            calendar_id: get("GOOGLE_CALENDAR_ID").unwrap_or(defaults.calendar_id),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            anthropic_model: get("ANTHROPIC_MODEL"),
            smtp_host: get("SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port,
            bind_addr,
            port,
            timezone,
            daily_reminder_time,
            meeting_reminder_minutes,
            reminders_enabled,
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }

    /// No provider keys at all
    pub fn is_demo_mode(&self) -> bool {
        self.keys.is_demo()
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.parse().map_err(|e| invalid(name, &v, e)),
        None => Ok(default),
    }
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
