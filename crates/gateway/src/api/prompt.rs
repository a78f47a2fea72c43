//! `POST /api/prompt` — the dashboard's own channel into the
//! orchestrator, addressed as `source="dashboard"` so it gets its own
//! lane apart from chat-adapter traffic.

use axum::extract::State;
use axum::Json;
use nxa_domain::error::Error;
use nxa_runtime::IncomingMessage;
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub text: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_user")]
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_channel() -> String {
    "default".to_string()
}

fn default_user() -> String {
    "dashboard".to_string()
}

pub async fn prompt(State(state): State<AppState>, Json(req): Json<PromptRequest>) -> ApiResult<Json<serde_json::Value>> {
    if req.text.trim().is_empty() {
        return Err(ApiError::from(Error::Validation("text must not be empty".into())));
    }

    let reply = state
        .runtime
        .handle_incoming(IncomingMessage {
            source: "dashboard".to_string(),
            channel_id: req.channel,
            user_id: req.user_id,
            session_id: req.session_id,
            text: req.text,
        })
        .await;

    Ok(Json(serde_json::json!({ "ok": true, "reply": reply })))
}
