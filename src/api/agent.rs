//! Assistant endpoints
//!
//! - POST /api/command  - free-text command, resolved through the model
//! - POST /api/schedule - structured meeting request
//! - POST /api/email    - structured email request
//! - GET  /api/events   - upcoming events
//! - POST /api/reminder - send the daily reminder now

use super::response::{ApiError, ApiJson, JsonReply};
use super::AppState;
use crate::action::{EmailRequest, MeetingRequest};
use crate::capabilities::Event;
use crate::dispatcher::CommandReply;
use crate::intent::IntentError;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// POST /api/command body
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// POST /api/schedule body
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub attendees: Vec<String>,
    pub start_time: String,
    pub duration_minutes: i64,
    pub title: String,
}

/// POST /api/email body
#[derive(Debug, Deserialize)]
pub struct EmailRequestBody {
    pub to_email: String,
    pub subject: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// GET /api/events response
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn process_command(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CommandRequest>,
) -> Result<JsonReply<CommandReply>, ApiError> {
    let command = request.command.trim();
    if command.is_empty() {
        return Err(ApiError::Validation("command is required".to_string()));
    }

    let span = info_span!("command", request_id = %Uuid::new_v4());
    async move {
        info!(command, "Processing command");
        match state.resolver.resolve(command).await {
            Ok(action) => state
                .dispatcher
                .dispatch(action)
                .await
                .map(JsonReply)
                .map_err(ApiError::from),
            Err(IntentError::Upstream(e)) => {
                Err(ApiError::Upstream(IntentError::Upstream(e).to_string()))
            }
            Err(e) => {
                warn!("Command not understood: {}", e);
                Ok(JsonReply(CommandReply::not_understood(&e)))
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn schedule_meeting(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> Result<JsonReply<CommandReply>, ApiError> {
    let meeting = MeetingRequest::parse(
        request.attendees,
        &request.start_time,
        request.duration_minutes,
        &request.title,
    )?;
    let reply = state
        .dispatcher
        .schedule_meeting(meeting)
        .instrument(info_span!("schedule", request_id = %Uuid::new_v4()))
        .await?;
    Ok(JsonReply(reply))
}

pub async fn send_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmailRequestBody>,
) -> Result<JsonReply<CommandReply>, ApiError> {
    let email = EmailRequest::parse(&request.to_email, &request.subject, request.body)?;
    let reply = state
        .dispatcher
        .send_email(email)
        .instrument(info_span!("email", request_id = %Uuid::new_v4()))
        .await?;
    Ok(JsonReply(reply))
}

pub async fn get_events(State(state): State<AppState>) -> Result<JsonReply<EventsResponse>, ApiError> {
    let events = state
        .dispatcher
        .orchestrator()
        .list_events()
        .instrument(info_span!("events", request_id = %Uuid::new_v4()))
        .await?;
    Ok(JsonReply(EventsResponse { events, error: None }))
}

pub async fn send_daily_reminder(
    State(state): State<AppState>,
) -> Result<JsonReply<CommandReply>, ApiError> {
    let reply = state
        .dispatcher
        .send_daily_reminder()
        .instrument(info_span!("reminder", request_id = %Uuid::new_v4()))
        .await?;
    Ok(JsonReply(reply))
}
