//! HTTP surface: a public set (console shell, health) and a
//! `x-nxclaw-token`-protected set, split the way the teacher's own
//! router layered its API-token middleware only over the routes that
//! needed it. CORS, tracing, and rate limiting are layered on in
//! `main.rs` once the router is otherwise complete.

pub mod console;
pub mod error;
pub mod events;
pub mod memory;
pub mod prompt;
pub mod runtime_state;
pub mod sessions;
pub mod settings;

use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::http_auth::require_dashboard_token;
use crate::state::AppState;

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the `x-nxclaw-token` dashboard-token middleware).
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/", get(console::console)).route("/healthz", get(healthz));

    let protected = Router::new()
        .route("/api/state", get(runtime_state::get_state))
        .route("/api/settings", get(settings::get_settings).post(settings::post_settings))
        .route("/api/sessions", get(sessions::list_sessions).post(sessions::create_session))
        .route("/api/sessions/archive", post(sessions::archive_session))
        .route("/api/memory/stats", get(memory::stats))
        .route("/api/memory/recent", get(memory::recent))
        .route("/api/memory/search", get(memory::search))
        .route("/api/memory/note", post(memory::note))
        .route("/api/memory/compact", post(memory::compact))
        .route("/api/memory/sync", post(memory::sync))
        .route("/api/memory/soul", get(memory::get_soul).post(memory::post_soul))
        .route("/api/events/recent", get(events::recent))
        .route("/api/events/stream", get(events::stream))
        .route("/api/prompt", post(prompt::prompt))
        .route_layer(middleware::from_fn_with_state(state, require_dashboard_token));

    public.merge(protected).layer(tower_http::trace::TraceLayer::new_for_http())
}
