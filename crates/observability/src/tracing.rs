//! Span macros and span-recording helpers.

/// Span for one HTTP request.
///
/// ```rust
/// use meridian_observability::http_request_span;
///
/// let span = http_request_span!("GET", "/api/turns/{turn_id}/stream", "req-1");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! http_request_span {
    ($method:expr, $route:expr, $request_id:expr) => {
        tracing::info_span!(
            "http.request",
            http.method = $method,
            http.route = $route,
            http.status_code = tracing::field::Empty,
            request.id = $request_id,
        )
    };
}

/// Span for an engine operation on one turn.
///
/// ```rust
/// use meridian_observability::turn_span;
///
/// let span = turn_span!("turn-123", "cancel");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! turn_span {
    ($turn_id:expr, $operation:expr) => {
        tracing::info_span!(
            "turn.operation",
            turn.id = %$turn_id,
            operation = $operation,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    };
}

/// Span for a durable store call.
///
/// ```rust
/// use meridian_observability::storage_span;
///
/// let span = storage_span!("sqlite", "append_block", "turn-123");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! storage_span {
    ($backend:expr, $operation:expr, $key:expr) => {
        tracing::debug_span!(
            "storage.operation",
            storage.backend = $backend,
            storage.operation = $operation,
            storage.key = %$key,
        )
    };
}

/// Mark the current span as failed and log the error.
///
/// Fields are only recorded when the span declared them.
pub fn record_error<E: std::error::Error>(error: &E) {
    let span = tracing::Span::current();
    span.record("error", true);
    span.record("error.message", error.to_string());
    tracing::error!(error = %error, "operation failed");
}

/// Record `duration` in milliseconds under `key` on the current span.
pub fn record_duration(key: &str, duration: std::time::Duration) {
    tracing::Span::current().record(key, duration.as_millis() as u64);
}
