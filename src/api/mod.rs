//! HTTP API
//!
//! Thin axum layer over the resolver and dispatcher: decode the request,
//! validate it, call one routine, encode the reply.

pub mod agent;
pub mod health;
pub mod response;

use crate::dispatcher::Dispatcher;
use crate::intent::IntentResolver;
use crate::orchestrator::Orchestrator;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use health::ServiceInfo;
pub use response::{envelope_timeout, ApiError, ApiJson, ErrorEnvelope, JsonReply};

/// State shared by the assistant handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<IntentResolver>,
    pub dispatcher: Dispatcher,
    pub info: Arc<ServiceInfo>,
}

impl AppState {
    /// Wire the resolver to the orchestrator's model and zone
    pub fn new(orchestrator: Arc<Orchestrator>, demo_mode: bool) -> Self {
        let resolver = IntentResolver::new(orchestrator.model(), orchestrator.composer().timezone());
        Self {
            resolver: Arc::new(resolver),
            dispatcher: Dispatcher::new(orchestrator),
            info: Arc::new(ServiceInfo::new(demo_mode)),
        }
    }
}

/// Create the full API router
///
/// Routes:
/// - GET /health, /healthz, /demo
/// - POST /api/command, /api/schedule, /api/email, /api/reminder
/// - GET /api/events
pub fn api_router(state: AppState) -> Router {
    let service_router = Router::new()
        .route("/health", get(health::health_check))
        .route("/healthz", get(health::liveness))
        .route("/demo", get(health::demo_info))
        .with_state(state.info.clone());

    let agent_router = Router::new()
        .route("/api/command", post(agent::process_command))
        .route("/api/schedule", post(agent::schedule_meeting))
        .route("/api/email", post(agent::send_email))
        .route("/api/events", get(agent::get_events))
        .route("/api/reminder", post(agent::send_daily_reminder))
        .with_state(state);

    Router::new().merge(service_router).merge(agent_router)
}
