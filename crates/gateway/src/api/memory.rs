//! `/api/memory/*`: stats, recent raw entries, hybrid search, manual
//! note/soul writes, and the compact/sync maintenance triggers.

use axum::extract::{Query, State};
use axum::Json;
use nxa_domain::error::Error;
use nxa_memory::{SearchMode, SearchQuery};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let raw: Vec<serde_json::Value> = nxa_fsutil::read_jsonl(&state.home.raw_jsonl()).map_err(ApiError::from)?;
    let compact: Vec<serde_json::Value> =
        nxa_fsutil::read_jsonl(&state.home.compact_jsonl()).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "isEmpty": state.memory.is_empty(),
        "rawEntryCount": raw.len(),
        "longTermNoteCount": compact.len(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut raw: Vec<serde_json::Value> = nxa_fsutil::read_jsonl(&state.home.raw_jsonl())
        .map_err(ApiError::from)?;
    if raw.len() > query.limit {
        raw = raw.split_off(raw.len() - query.limit);
    }
    Ok(Json(serde_json::json!({ "ok": true, "entries": raw })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    q: String,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    session_key: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQueryParams>,
) -> ApiResult<Json<serde_json::Value>> {
    if params.q.trim().is_empty() {
        return Err(ApiError::from(Error::Validation("q must not be empty".into())));
    }
    let mode = match params.mode.as_deref() {
        Some("session_strict") | Some("sessionStrict") => SearchMode::SessionStrict,
        _ => SearchMode::Global,
    };
    let hits = state
        .memory
        .search(SearchQuery {
            text: params.q,
            limit: params.limit,
            session_key: params.session_key,
            mode,
        })
        .await
        .map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "ok": true, "hits": hits })))
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    title: String,
    content: String,
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_source() -> String {
    "dashboard".to_string()
}

pub async fn note(State(state): State<AppState>, Json(req): Json<NoteRequest>) -> ApiResult<Json<serde_json::Value>> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::from(Error::Validation("title and content are required".into())));
    }
    let note = state.memory.append_note(req.title, req.content, req.source, req.tags).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "ok": true, "note": note })))
}

#[derive(Debug, Deserialize)]
pub struct CompactRequest {
    #[serde(default = "default_compaction_threshold")]
    threshold: usize,
    #[serde(default)]
    force: bool,
}

fn default_compaction_threshold() -> usize {
    120
}

pub async fn compact(
    State(state): State<AppState>,
    Json(req): Json<CompactRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let note = state.memory.compact(req.threshold, req.force).await.map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "ok": true, "note": note })))
}

pub async fn sync(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    state.memory.reindex().await.map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn get_soul(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let path = state.home.workspace_file("SOUL.md");
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ApiError::from(Error::Io(e))),
    };
    Ok(Json(serde_json::json!({ "ok": true, "text": text })))
}

#[derive(Debug, Deserialize)]
pub struct SoulRequest {
    text: String,
    #[serde(default)]
    replace: bool,
    #[serde(default = "default_true")]
    mirror_to_journal: bool,
}

fn default_true() -> bool {
    true
}

pub async fn post_soul(State(state): State<AppState>, Json(req): Json<SoulRequest>) -> ApiResult<Json<serde_json::Value>> {
    state
        .memory
        .write_soul(&req.text, req.replace, req.mirror_to_journal)
        .map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
