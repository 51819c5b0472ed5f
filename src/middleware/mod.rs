//! Axum host integration.
//!
//! # Responsibilities
//! - Drive the transaction lifecycle around each request, guaranteeing
//!   start-before-end exactly once even for error responses
//! - Assign/propagate the client session id used to link traces
//!
//! # Design Decisions
//! - One `TransactionLifecycle` is built per request; only the session
//!   registry and the sink are shared process-wide
//! - The session id travels in the `x-session-id` header and is echoed on
//!   the response so stateless clients can keep their trace alive
//! - The route identifier prefers the router's matched path pattern over
//!   the raw URI path, so `/orders/42` and `/orders/7` fold into one route

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header::HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::config::TracingConfig;
use crate::lifecycle::{RequestInfo, TransactionLifecycle};
use crate::session::SessionRegistry;
use crate::sink::TraceSink;

/// Header carrying the client session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Process-wide state for the tracing middleware.
pub struct TraceState {
    pub config: Arc<TracingConfig>,
    pub sessions: Arc<SessionRegistry>,
    pub sink: Arc<dyn TraceSink>,
}

impl TraceState {
    pub fn new(config: TracingConfig, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionRegistry::new()),
            sink,
        }
    }
}

/// Middleware function instrumenting each request with a transaction.
///
/// Install with `axum::middleware::from_fn_with_state(state, trace_middleware)`.
pub async fn trace_middleware(
    State(state): State<Arc<TraceState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let session_id = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().as_simple().to_string());

    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let info = RequestInfo {
        handler: format!("{} {}", request.method(), route),
        route,
        query_string: request.uri().query().map(str::to_string),
        http: true,
    };

    let session = state.sessions.session(&session_id);
    let mut lifecycle =
        TransactionLifecycle::new(&state.config, session, state.sink.clone());
    lifecycle.on_request_start(&info);

    let mut response = next.run(request).await;

    lifecycle.on_request_end();

    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
