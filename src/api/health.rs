//! Health and demo endpoints

use super::response::SuccessEnvelope;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Process-level facts shared by the service endpoints
#[derive(Clone)]
pub struct ServiceInfo {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    pub version: &'static str,
    /// No provider configured; every adapter is canned
    pub demo_mode: bool,
}

impl ServiceInfo {
    pub fn new(demo_mode: bool) -> Self {
        Self {
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
            demo_mode,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Health payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub envelope: SuccessEnvelope<&'static str>,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn health_check(State(info): State<Arc<ServiceInfo>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        envelope: SuccessEnvelope::new("AI Executive Assistant is running"),
        version: info.version,
        uptime_secs: info.uptime_secs(),
    })
}

/// GET /healthz (liveness)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /demo - endpoint overview for exploring without credentials
pub async fn demo_info(State(info): State<Arc<ServiceInfo>>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "AI Executive Assistant Demo Mode",
        "status": "running",
        "demo_mode": info.demo_mode,
        "endpoints": {
            "health": "GET /health",
            "command": "POST /api/command",
            "schedule": "POST /api/schedule",
            "email": "POST /api/email",
            "events": "GET /api/events",
            "reminder": "POST /api/reminder"
        },
        "examples": {
            "command": {"command": "Schedule a meeting with john@example.com tomorrow at 2pm for 30 minutes about Q3 planning"},
            "schedule": {
                "attendees": ["john@example.com"],
                "start_time": "2025-01-15T14:00:00Z",
                "duration_minutes": 30,
                "title": "Q3 Planning"
            },
            "email": {"to_email": "john@example.com", "subject": "Project update"}
        },
        "note": "Set GOOGLE_CALENDAR_API_KEY, SENDGRID_API_KEY (or GMAIL_APP_PASSWORD) and GEMINI_API_KEY (or ANTHROPIC_API_KEY) for live providers"
    }))
}
