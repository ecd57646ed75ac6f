//! Executive Assistant
//!
//! Natural-language calendar and email orchestration over HTTP.
//!
//! # Features
//!
//! - **Intent Resolution**: free-text commands → one structured action via a language model
//! - **Scheduling**: calendar write + per-attendee confirmations with isolated failures
//! - **Email**: direct sends, model-written bodies when none is given
//! - **Reminders**: on-demand daily summary, optional background daily/meeting reminders
//! - **Demo Mode**: canned adapters when no provider is configured
//!
//! # Architecture
//!
//! ```text
//! HTTP ──► api ──► IntentResolver ──► Dispatcher ──► Orchestrator
//!                       │                               │
//!                       └──── LanguageModelCapability ◄─┤
//!                              (Gemini/Claude/Demo)     ├── CalendarCapability
//!                                                       │    (Google/Demo)
//!                                                       └── NotificationCapability
//!                                                            (SendGrid/SMTP/Demo)
//! ```

pub mod action;
pub mod api;
pub mod capabilities;
pub mod composer;
pub mod config;
pub mod dispatcher;
pub mod intent;
pub mod orchestrator;
pub mod reminders;
pub mod server;

pub use action::{Action, ActionError, ActionKind, EmailRequest, MeetingRequest};
pub use api::{api_router, ApiError, AppState};
pub use capabilities::{
    Capabilities, CalendarCapability, Event, LanguageModelCapability, NotificationCapability,
    UpstreamError,
};
pub use composer::Composer;
pub use config::{AssistantIdentity, Config, ConfigError};
pub use dispatcher::{CommandReply, Dispatcher};
pub use intent::{IntentError, IntentResolver};
pub use orchestrator::{OperationOutcome, Orchestrator, OrchestratorError};
pub use reminders::{ReminderConfig, ReminderScheduler};
pub use server::AssistantServer;
