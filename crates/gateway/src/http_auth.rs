//! Dashboard token middleware: when `dashboard.token` is configured,
//! every non-loopback request must carry a matching `x-nxclaw-token`
//! header or `?token=` query parameter.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

fn tokens_match(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

/// `middleware::from_fn_with_state` entry point protecting every route
/// outside the public set (console shell, health).
pub async fn require_dashboard_token(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.dashboard_token.as_deref() else {
        return next.run(req).await;
    };

    let is_loopback = connect_info.map(|ConnectInfo(addr)| addr.ip().is_loopback()).unwrap_or(false);
    if is_loopback {
        return next.run(req).await;
    }

    let header_token = req
        .headers()
        .get("x-nxclaw-token")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let query_token = Query::<TokenQuery>::try_from_uri(req.uri()).ok().and_then(|q| q.0.token);

    let supplied = header_token.or(query_token);
    match supplied {
        Some(token) if tokens_match(expected, &token) => next.run(req).await,
        _ => unauthorized(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "ok": false, "error": "unauthorized" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_tokens_match() {
        assert!(tokens_match("secret", "secret"));
    }

    #[test]
    fn differing_tokens_do_not_match() {
        assert!(!tokens_match("secret", "guess"));
    }
}
