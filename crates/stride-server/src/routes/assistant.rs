use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use stride_core::{parse_user_choices, Instruction};

use crate::error::AppError;
use crate::state::AppState;

/// Instruction arrays and choices stay raw here so one unreadable element
/// fails on its own inside the batch instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantBody {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    context_instructions: Vec<Value>,
    #[serde(default)]
    confirm: bool,
    #[serde(default)]
    pending_actions: Vec<Value>,
    #[serde(default)]
    user_choices: Value,
}

fn instructions(raw: Vec<Value>) -> Vec<Instruction> {
    raw.into_iter().map(Instruction::from_value_lenient).collect()
}

/// POST /api/assistant: propose when `confirm` is absent, execute the
/// supplied `pendingActions` when it is true.
pub async fn handle(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AssistantBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let user_id = headers
        .get(app.user_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::unauthorized("missing user"))?
        .to_string();

    let Json(body) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    if body.confirm {
        let pending = instructions(body.pending_actions);
        let choices = parse_user_choices(&body.user_choices);
        tracing::info!(user_id = %user_id, actions = pending.len(), "confirm");
        let report = app
            .assistant
            .confirm(&user_id, &pending, &choices)
            .await
            .map_err(|e| AppError::from(e).with_details(app.expose_details))?;
        return Ok(Json(serde_json::json!({
            "success": report.success,
            "message": report.message,
            "actions": report.actions,
        })));
    }

    let query = body
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request("query is required"))?;

    tracing::info!(user_id = %user_id, "propose");
    let context = instructions(body.context_instructions);
    let proposal = app
        .assistant
        .propose(&user_id, query, &context)
        .await
        .map_err(|e| AppError::from(e).with_details(app.expose_details))?;
    let json = serde_json::to_value(&proposal)
        .map_err(|e| AppError::from(e).with_details(app.expose_details))?;
    Ok(Json(json))
}
