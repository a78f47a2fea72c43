//! The single HTML console served at `GET /`: a lightweight status page
//! plus links into the JSON API, in the same inline-`format!` style the
//! dashboard page it replaces used rather than a bundled SPA.

use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::state::AppState;

pub async fn console(State(state): State<AppState>) -> impl IntoResponse {
    let runtime_state = state.runtime.get_state(false, 0).await;
    let autonomous = state.autonomous.snapshot();
    let readiness = state.skills.readiness_summary();

    let lanes_html: String = runtime_state
        .lanes
        .iter()
        .map(|l| {
            format!(
                "<li><code>{}</code> — {} messages{}</li>",
                l.lane_key,
                l.message_count,
                if l.running { " (running)" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>nxclaw</title>
<style>
  body {{ font-family: system-ui, sans-serif; max-width: 900px; margin: 2rem auto; padding: 0 1rem; background: #0d1117; color: #c9d1d9; }}
  h1 {{ color: #58a6ff; }}
  h2 {{ color: #79c0ff; border-bottom: 1px solid #21262d; padding-bottom: 0.3em; margin-top: 2em; }}
  ul {{ padding-left: 1.5em; }}
  li {{ margin: 0.3em 0; }}
  a {{ color: #58a6ff; text-decoration: none; }}
  a:hover {{ text-decoration: underline; }}
  .card {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem; margin: 0.5rem 0; }}
  code {{ background: #21262d; padding: 0.2em 0.4em; border-radius: 3px; font-size: 0.9em; }}
</style>
</head>
<body>
<h1>nxclaw</h1>
<p>Authenticated: <code>{authenticated}</code> &middot; Queue depth: <code>{depth}/{max_depth}</code>
   &middot; Autonomous: <code>{auto_enabled}</code></p>

<h2>Conversation lanes ({lane_count})</h2>
<div class="card">
<ul>{lanes_html}</ul>
</div>

<h2>Skills</h2>
<div class="card">
<p>{ready} ready of {total} ({missing} missing dependencies, {unsupported} unsupported)</p>
</div>

<h2>API</h2>
<div class="card">
<ul>
<li><a href="/api/state">/api/state</a></li>
<li><a href="/api/sessions">/api/sessions</a></li>
<li><a href="/api/memory/stats">/api/memory/stats</a></li>
<li><a href="/api/events/recent">/api/events/recent</a></li>
</ul>
</div>
</body>
</html>"#,
        authenticated = runtime_state.authenticated,
        depth = runtime_state.queue_depth,
        max_depth = runtime_state.max_queue_depth,
        auto_enabled = autonomous.enabled,
        lane_count = runtime_state.lanes.len(),
        ready = readiness.ready,
        total = readiness.total,
        missing = readiness.missing_deps,
        unsupported = readiness.unsupported,
    );

    Html(html)
}
