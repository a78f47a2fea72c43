//! `GET/POST /api/settings` — read and update `<home>/config.json`.
//!
//! Only the autonomous-loop section can be live-applied to the running
//! process (`AutonomousLoop::reconfigure`); every other section takes
//! effect on next start. `POST` always persists the full merged config
//! so a restart picks up everything, and reports which sections applied
//! immediately.

use axum::extract::State;
use axum::Json;
use nxa_domain::config::Config;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let config = Config::load_or_default(&state.home.config_json()).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "ok": true, "config": config })))
}

pub async fn post_settings(
    State(state): State<AppState>,
    Json(config): Json<Config>,
) -> ApiResult<Json<serde_json::Value>> {
    nxa_fsutil::write_json_atomic(&state.home.config_json(), &config).map_err(ApiError::from)?;

    state.autonomous.reconfigure(config.autonomous.clone());

    Ok(Json(serde_json::json!({
        "ok": true,
        "appliedImmediately": ["autonomous"],
        "restartRequired": ["runtime", "memory", "chrome", "skills", "dashboard", "tasks", "llm", "contextpack", "home"],
    })))
}
