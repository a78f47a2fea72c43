//! `/api/sessions`: list conversation lanes, open a new one, or archive
//! an existing one — thin wrappers over the orchestrator's own lane
//! bookkeeping.

use axum::extract::State;
use axum::Json;
use nxa_domain::error::Error;
use nxa_runtime::LaneSessionInfoDto;
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let lanes: Vec<LaneSessionInfoDto> =
        state.runtime.list_conversation_sessions().iter().map(LaneSessionInfoDto::from).collect();
    Json(serde_json::json!({ "ok": true, "sessions": lanes }))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub source: String,
    pub channel: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.source.trim().is_empty() || req.channel.trim().is_empty() {
        return Err(ApiError::from(Error::Validation("source and channel are required".into())));
    }
    let lane = state
        .runtime
        .create_conversation_session(&req.source, &req.channel, req.session_id.as_deref());
    Ok(Json(serde_json::json!({ "ok": true, "session": LaneSessionInfoDto::from(&lane) })))
}

#[derive(Debug, Deserialize)]
pub struct ArchiveSessionRequest {
    pub lane_key: String,
}

pub async fn archive_session(
    State(state): State<AppState>,
    Json(req): Json<ArchiveSessionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state.runtime.archive_conversation_session(&req.lane_key).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
