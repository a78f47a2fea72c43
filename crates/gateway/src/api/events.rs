//! `/api/events/*`: the recent-events buffer and a live SSE tail,
//! wired to [`EventBus::subscribe`] the way run events were tailed.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn recent(State(state): State<AppState>, Query(query): Query<RecentQuery>) -> Json<serde_json::Value> {
    let events = state.events.as_ref().map(|bus| bus.get_recent(query.limit)).unwrap_or_default();
    Json(serde_json::json!({ "ok": true, "events": events }))
}

pub async fn stream(State(state): State<AppState>) -> impl IntoResponse {
    let Some(bus) = state.events.clone() else {
        let stream = futures_util::stream::once(async {
            Ok::<_, Infallible>(Event::default().event("error").data(r#"{"error":"events disabled"}"#))
        });
        return Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    };

    let rx = bus.subscribe();
    let stream = make_event_stream(rx);
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_millis(15_000)).text(""))
        .into_response()
}

fn make_event_stream(
    mut rx: tokio::sync::broadcast::Receiver<nxa_eventbus::EventRecord>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(record) => {
                    let data = serde_json::to_string(&record).unwrap_or_default();
                    yield Ok(Event::default().event(record.kind.clone()).data(data));
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(Event::default().event("warning").data(format!("{{\"missed\":{n}}}")));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
