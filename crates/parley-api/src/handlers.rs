//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its input via axum extractors, drives the
//! orchestrator or repositories through AppState, and returns JSON (or raw
//! audio for artifact downloads).

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parley_chat::TurnOutcome;
use parley_core::{ParleyError, TurnId, UserIdentity};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request and response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub conversation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ConversationsParams {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
    pub audio_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BannerResponse {
    pub message: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}

fn turn_response(outcome: TurnOutcome) -> ChatResponse {
    ChatResponse {
        audio_url: outcome
            .audio_ref
            .as_ref()
            .map(|_| format!("/audio/{}", outcome.turn_id)),
        response: outcome.response,
        conversation_id: outcome.turn_id.to_string(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET / - service banner.
pub async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Parley conversational AI service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /chat - run a text turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state
        .orchestrator
        .handle_text(&req.message, req.user_id, req.user_email)
        .await?;

    Ok(Json(turn_response(outcome)))
}

/// POST /voice - run a voice turn from multipart audio.
///
/// The `audio` file field is required; `user_id` and `user_email` are
/// optional text fields. Unknown fields are ignored.
pub async fn voice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut audio: Option<Vec<u8>> = None;
    let mut user_id: Option<String> = None;
    let mut user_email: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed reading 'audio' bytes: {e}"))
                })?;
                audio = Some(bytes.to_vec());
            }
            "user_id" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed reading 'user_id' field: {e}"))
                })?;
                user_id = Some(text);
            }
            "user_email" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed reading 'user_email' field: {e}"))
                })?;
                user_email = Some(text);
            }
            _ => {}
        }
    }

    let audio =
        audio.ok_or_else(|| ApiError::BadRequest("Missing required 'audio' field".to_string()))?;
    if audio.is_empty() {
        return Err(ApiError::BadRequest("Audio field is empty".to_string()));
    }

    let outcome = state
        .orchestrator
        .handle_voice(&audio, user_id, user_email)
        .await?;

    Ok(Json(turn_response(outcome)))
}

/// GET /audio/{conversation_id} - stream the stored artifact for a turn.
///
/// The response role is preferred; input audio is the fallback for turns
/// whose synthesis failed.
pub async fn audio(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Response, ApiError> {
    let turn_id = conversation_id
        .parse::<Uuid>()
        .map(TurnId)
        .map_err(|_| ApiError::BadRequest("Invalid conversation id".to_string()))?;

    match state.audio.get(turn_id) {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "audio/mpeg")], bytes).into_response()),
        Err(ParleyError::NotFound(_)) => {
            Err(ApiError::NotFound("Audio file not found".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /conversations - committed turns, newest first.
pub async fn conversations(
    State(state): State<AppState>,
    Query(params): Query<ConversationsParams>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(20).min(100).max(1);
    let identity = UserIdentity::from_parts(params.user_id, params.user_email);

    let turns = state.turns.history(identity.as_ref(), limit)?;

    let conversations = turns
        .into_iter()
        .map(|t| ConversationRecord {
            id: t.id.to_string(),
            user_id: t.user_id,
            user_email: t.user_email,
            user_message: t.user_message,
            ai_response: t.ai_response,
            created_at: t.created_at,
            audio_ref: t.audio_ref,
        })
        .collect();

    Ok(Json(ConversationsResponse { conversations }))
}

/// GET /health - liveness plus a store connectivity check.
pub async fn health(State(state): State<AppState>) -> Response {
    match state.database.ping() {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                database: "connected".to_string(),
                timestamp: Utc::now(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    database: "disconnected".to_string(),
                    timestamp: Utc::now(),
                }),
            )
                .into_response()
        }
    }
}
