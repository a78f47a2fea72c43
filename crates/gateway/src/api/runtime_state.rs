//! `GET /api/state` — the orchestrator's full snapshot, same shape the
//! console's own refresh loop polls.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    #[serde(default)]
    include_events: bool,
    #[serde(default = "default_events_limit")]
    events_limit: usize,
}

fn default_events_limit() -> usize {
    50
}

pub async fn get_state(State(state): State<AppState>, Query(query): Query<StateQuery>) -> Json<serde_json::Value> {
    let runtime_state = state.runtime.get_state(query.include_events, query.events_limit).await;
    Json(serde_json::json!({ "ok": true, "state": runtime_state }))
}
