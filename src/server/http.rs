//! HTTP request handlers
//!
//! Request bodies are parsed into records with optional fields and validated
//! here, so a malformed request is rejected before any generation or storage.

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::Turn;

/// Reply generation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReplyRequest {
    pub client_sequence: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<Turn>,
}

/// Learning step request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveRequest {
    pub client_sequence: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<Turn>,
    pub consultant_reply: Option<String>,
}

/// Manual prompt update request
#[derive(Debug, Deserialize)]
pub struct ManualImproveRequest {
    pub instructions: Option<String>,
}

/// Direct prompt edit request
#[derive(Debug, Deserialize)]
pub struct SavePromptRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReplyResponse {
    pub ai_reply: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedPromptResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    pub updated_prompt: String,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::UserInputInvalid(format!("Invalid request body: {}", e.body_text())))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::UserInputInvalid(format!("Missing {field}")))
}

/// Liveness probe
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Currently active prompt text
pub async fn active_prompt_handler(State(state): State<AppState>) -> impl IntoResponse {
    let prompt = state.engine.active_prompt();
    Json(json!({ "prompt": prompt }))
}

/// Generate a consultant reply with the active prompt
pub async fn generate_reply_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateReplyRequest>, JsonRejection>,
) -> Result<Json<GenerateReplyResponse>, ApiError> {
    let req = body(payload)?;
    let client_sequence = required(req.client_sequence, "clientSequence")?;

    let ai_reply = state.engine.reply(&client_sequence, &req.chat_history).await;
    Ok(Json(GenerateReplyResponse { ai_reply }))
}

/// Run one learning step against a real consultant reply
pub async fn improve_handler(
    State(state): State<AppState>,
    payload: Result<Json<ImproveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body(payload)?;
    let client_sequence = required(req.client_sequence, "clientSequence")?;
    let consultant_reply = required(req.consultant_reply, "consultantReply")?;

    let improvement = state
        .engine
        .improve(&client_sequence, &req.chat_history, &consultant_reply)
        .await;
    Ok(Json(improvement))
}

/// Apply free-text instructions to the active prompt
pub async fn improve_manually_handler(
    State(state): State<AppState>,
    payload: Result<Json<ManualImproveRequest>, JsonRejection>,
) -> Result<Json<UpdatedPromptResponse>, ApiError> {
    let req = body(payload)?;
    let instructions = required(req.instructions, "instructions")?;

    let updated_prompt = state.engine.apply_instructions(&instructions).await?;
    info!("Prompt updated from manual instructions");
    Ok(Json(UpdatedPromptResponse { status: None, updated_prompt }))
}

/// Save operator-edited prompt text as the new active version
pub async fn save_prompt_handler(
    State(state): State<AppState>,
    payload: Result<Json<SavePromptRequest>, JsonRejection>,
) -> Result<Json<UpdatedPromptResponse>, ApiError> {
    let req = body(payload)?;
    let prompt = required(req.prompt, "prompt")?;

    let updated_prompt = state.engine.direct_save(&prompt)?;
    Ok(Json(UpdatedPromptResponse {
        status: Some("success"),
        updated_prompt,
    }))
}
