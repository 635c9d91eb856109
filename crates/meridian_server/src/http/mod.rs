//! axum routes over the turn engine.
//!
//! ```text
//! POST /api/chats/{chat_id}/turns     start a turn           201
//! GET  /api/turns/{turn_id}           turn + blocks          200
//! POST /api/turns/{turn_id}/cancel    request cancellation   202
//! GET  /api/turns/{turn_id}/stream    SSE, resumable         200
//! GET  /api/models                    capability listing     200
//! GET  /healthz                                              200
//! ```
//!
//! Callers are identified by the `X-User-Id` header; authentication
//! happens upstream of this server.

mod error;
mod meta;
mod stream;
mod turns;

pub use error::ApiError;

use std::time::Duration;

use axum::Router;
use axum::extract::{FromRequestParts, MatchedPath, Request};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::response::Response;
use axum::routing::{get, post};
use meridian_runtime::Engine;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub sse_keepalive: Duration,
}

impl AppState {
    pub fn new(engine: Engine, sse_keepalive: Duration) -> Self {
        Self { engine, sse_keepalive }
    }
}

/// Caller identity taken from `X-User-Id`.
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthenticated)?;
        Ok(CallerId(user_id.to_string()))
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/healthz", get(meta::healthz))
        .route("/api/models", get(meta::list_models))
        .route("/api/chats/{chat_id}/turns", post(turns::create_turn))
        .route("/api/turns/{turn_id}", get(turns::get_turn))
        .route("/api/turns/{turn_id}/cancel", post(turns::cancel_turn))
        .route("/api/turns/{turn_id}/stream", get(stream::stream_turn))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_response(record_response),
        )
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static("last-event-id"),
        ])
}

fn make_request_span(request: &Request) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or_else(|| request.uri().path());
    let request_id = uuid::Uuid::new_v4().to_string();
    meridian_observability::http_request_span!(request.method().as_str(), route, request_id.as_str())
}

fn record_response(response: &Response, latency: Duration, span: &Span) {
    span.record("http.status_code", response.status().as_u16());
    tracing::debug!(latency_ms = latency.as_millis() as u64, "response sent");
}
