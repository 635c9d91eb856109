//! Resumable SSE stream of one turn.
//!
//! Committed blocks carry `id: <sequence>`, so a reconnecting `EventSource`
//! sends `Last-Event-ID` and picks up after the last block it saw. Deltas,
//! status changes and the terminal event carry no id.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use meridian_core::{TurnEvent, TurnId};
use serde::Deserialize;

use super::{ApiError, AppState, CallerId};

const LAST_EVENT_ID: &str = "last-event-id";

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Fallback for clients that cannot set `Last-Event-ID`.
    pub last_event_id: Option<String>,
}

/// GET /api/turns/{turn_id}/stream
#[tracing::instrument(skip(state, headers), fields(user.id = %caller.0))]
pub async fn stream_turn(
    State(state): State<AppState>,
    caller: CallerId,
    Path(turn_id): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let header_id = headers.get(LAST_EVENT_ID).and_then(|value| value.to_str().ok());
    let last_seen = resume_point(header_id.or(query.last_event_id.as_deref()))?;

    let subscription = state
        .engine
        .subscribe(&caller.0, &TurnId(turn_id), last_seen)
        .await?;
    tracing::debug!(turn.id = %subscription.turn_id(), last_seen, "stream opened");

    let events = subscription
        .into_stream()
        .map(|event| Ok::<_, Infallible>(to_sse(&event)));
    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(state.sse_keepalive));

    let headers = [
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no")),
    ];
    Ok((headers, sse).into_response())
}

/// Sequence to resume after; absent or blank means from the start.
fn resume_point(raw: Option<&str>) -> Result<u64, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("last event id '{value}' is not a block sequence"))),
    }
}

fn to_sse(event: &TurnEvent) -> Event {
    let mut sse = Event::default().event(event.event_name());
    if let TurnEvent::Block { block } = event {
        sse = sse.id(block.sequence.to_string());
    }
    match sse.json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            tracing::warn!(event = event.event_name(), error = %e, "could not encode stream event");
            Event::default()
                .event("error")
                .data(format!("could not encode {} event", event.event_name()))
        }
    }
}
