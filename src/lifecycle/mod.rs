//! Per-request transaction lifecycle.
//!
//! # Responsibilities
//! - Drive the request state machine:
//!   `Idle → TransactionOpen → ProcessingSpanOpen → ProcessingSpanClosed →
//!   TransactionClosed`
//! - Resolve trace continuation at request start and persist the resolved
//!   state immediately
//! - Open/close the transaction and its nested processing span
//! - Persist the parent-sampled/parent-span linkage for the next request
//!
//! # Design Decisions
//! - One `TransactionLifecycle` per request; nothing here is shared across
//!   concurrent requests (the session store is the only cross-request
//!   state, and it is per client session)
//! - Every missing-context condition is a silent no-op: instrumentation
//!   must be invisible to request success or failure
//! - The host guarantees `on_request_start` runs strictly before
//!   `on_request_end`, exactly once each; the bundled middleware upholds
//!   this for axum hosts

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::TracingConfig;
use crate::metrics;
use crate::scope::{Breadcrumb, BreadcrumbKind, BreadcrumbLevel, Scope};
use crate::session::{keys, SessionStore};
use crate::sink::{TraceSink, TransactionEnvelope};
use crate::trace::{
    unix_now, ContinuationState, Span, SpanId, SpanStack, TraceContinuationPolicy, TraceId,
    Transaction, TransactionContext,
};

/// Operation kind of every request transaction.
pub const TRANSACTION_OP: &str = "http.request";

/// Operation name of the nested span covering request processing.
pub const PROCESSING_OP: &str = "request.processing";

/// What the host knows about an inbound request at dispatch time.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Route identifier of the dispatched action, e.g. `checkout/pay`.
    pub route: String,
    /// Handler identity, recorded as breadcrumb metadata.
    pub handler: String,
    /// Query string, tagged onto the scope when present.
    pub query_string: Option<String>,
    /// Whether this is an instrumentable HTTP execution context. When
    /// false (e.g. a console command), no transaction is opened.
    pub http: bool,
}

impl RequestInfo {
    pub fn new(route: impl Into<String>) -> Self {
        let route = route.into();
        Self {
            handler: route.clone(),
            route,
            query_string: None,
            http: true,
        }
    }
}

/// Request state machine positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    TransactionOpen,
    ProcessingSpanOpen,
    ProcessingSpanClosed,
    TransactionClosed,
}

/// Orchestrates transaction creation at request start and completion at
/// request end, wiring the span stack and continuation policy together.
pub struct TransactionLifecycle {
    policy: TraceContinuationPolicy,
    session: Arc<dyn SessionStore>,
    sink: Arc<dyn TraceSink>,
    scope: Scope,
    stack: SpanStack,
    state: RequestState,
    transaction: Option<Transaction>,
    processing: Option<(Span, Span)>,
}

impl TransactionLifecycle {
    pub fn new(
        config: &TracingConfig,
        session: Arc<dyn SessionStore>,
        sink: Arc<dyn TraceSink>,
    ) -> Self {
        let mut scope = Scope::new();
        for (name, value) in &config.client.extra_tags {
            scope.set_tag(name.clone(), value.clone());
        }
        Self {
            policy: TraceContinuationPolicy::new(config.tracing_groups.clone()),
            session,
            sink,
            scope,
            stack: SpanStack::new(),
            state: RequestState::Idle,
            transaction: None,
            processing: None,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// The currently active span, if any.
    pub fn current_span(&self) -> Option<&Span> {
        self.stack.current()
    }

    /// Begin instrumenting a request: resolve continuation, open the
    /// transaction and the nested processing span.
    ///
    /// Non-HTTP execution contexts are skipped entirely and the lifecycle
    /// stays idle.
    pub fn on_request_start(&mut self, request: &RequestInfo) {
        if !request.http {
            tracing::debug!(route = %request.route, "non-HTTP context, skipping transaction");
            return;
        }

        let mut metadata = HashMap::new();
        metadata.insert(
            "action".to_string(),
            serde_json::Value::String(request.handler.clone()),
        );
        self.scope.add_breadcrumb(Breadcrumb::new(
            BreadcrumbLevel::Info,
            BreadcrumbKind::Navigation,
            "route",
            request.route.clone(),
            metadata,
        ));
        self.scope.set_tag("route", request.route.clone());
        if let Some(query) = &request.query_string {
            self.scope.set_tag("url", query.clone());
        }

        let now = unix_now();
        let persisted = self.read_persisted();
        let resolution = self.policy.resolve(persisted.as_ref(), &request.route, now);
        self.persist_resolved(&resolution.state, resolution.restarted);
        metrics::record_trace_decision(resolution.restarted);

        tracing::debug!(
            route = %request.route,
            trace_id = %resolution.state.trace_id,
            counter = resolution.state.request_counter,
            restarted = resolution.restarted,
            "transaction starting"
        );

        let mut tags = HashMap::new();
        tags.insert(
            "begins".to_string(),
            (now - resolution.state.started_at).to_string(),
        );
        tags.insert(
            "counter".to_string(),
            resolution.state.request_counter.to_string(),
        );
        tags.insert(
            "trace.restarted".to_string(),
            resolution.restarted.to_string(),
        );

        let transaction = Transaction::start(
            TransactionContext {
                name: request.route.clone(),
                op: TRANSACTION_OP.to_string(),
                trace_id: resolution.state.trace_id,
                parent_sampled: resolution.state.parent_sampled,
                parent_span_id: resolution.state.parent_span_id,
                tags,
            },
            Some(now),
        );
        self.stack.replace(Some(transaction.root().clone()));
        self.transaction = Some(transaction);
        self.state = RequestState::TransactionOpen;

        self.processing = self.stack.push(PROCESSING_OP, None);
        self.state = RequestState::ProcessingSpanOpen;
    }

    /// Finish the processing span and the transaction, persisting the
    /// parent linkage for the next request from this session.
    ///
    /// A no-op when no transaction is in flight (request start was skipped
    /// or never ran).
    pub fn on_request_end(&mut self) {
        let Some(transaction) = self.transaction.take() else {
            tracing::debug!("no transaction in flight, skipping finish");
            return;
        };

        // Processing span may have been drained early; finishing is
        // skipped, not raised.
        if let Some((span, previous)) = self.processing.take() {
            self.stack.pop(Some(span), Some(previous), None);
        }
        self.state = RequestState::ProcessingSpanClosed;

        match transaction.sampled() {
            Some(sampled) => self.session.set(keys::PARENT_SAMPLED, sampled.to_string()),
            None => self.session.remove(keys::PARENT_SAMPLED),
        }
        self.session
            .set(keys::PARENT_ID, transaction.span_id().to_string());

        let name = transaction.name().to_string();
        let finished = transaction.finish(None);
        self.stack.replace(None);
        self.state = RequestState::TransactionClosed;

        self.sink.submit(TransactionEnvelope {
            transaction: finished,
            scope: self.scope.clone(),
        });
        metrics::record_transaction(&name);
    }

    /// Attach a tag to the ambient scope; valid in any state.
    pub fn add_tag(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.scope.set_tag(name, value);
    }

    /// Open an ad-hoc nested span under the current active span.
    ///
    /// Returns `None` (with no side effect) when no span is active.
    pub fn add_span(&mut self, op: &str, timestamp: Option<f64>) -> Option<(Span, Span)> {
        self.stack.push(op, timestamp)
    }

    /// Finish a span opened with [`add_span`](Self::add_span).
    ///
    /// With `span` omitted, finishes the currently active span. Supplying
    /// `previous` restores it as current; callers needing strict nesting
    /// must pass the previous span saved at open time.
    pub fn finish_span(
        &mut self,
        span: Option<Span>,
        previous: Option<Span>,
        timestamp: Option<f64>,
    ) {
        self.stack.pop(span, previous, timestamp);
    }

    // --- Session persistence ---

    /// Read the continuation bundle persisted by the previous request.
    ///
    /// A bundle missing any of its mandatory fields (trace id, start time,
    /// counter, last route) is treated as absent, upholding the
    /// both-present-or-both-absent invariant.
    fn read_persisted(&self) -> Option<ContinuationState> {
        let trace_id = TraceId::from_str(&self.session.get(keys::TRACE_ID)?).ok()?;
        let started_at: f64 = self.session.get(keys::TRACE_STARTED)?.parse().ok()?;
        let request_counter: u64 = self.session.get(keys::TRACE_COUNTER)?.parse().ok()?;
        let last_route = self.session.get(keys::TRACE_LAST_ACTION)?;

        let parent_sampled = self
            .session
            .get(keys::PARENT_SAMPLED)
            .and_then(|v| v.parse().ok());
        let parent_span_id = self
            .session
            .get(keys::PARENT_ID)
            .and_then(|v| SpanId::from_str(&v).ok());

        Some(ContinuationState {
            trace_id,
            started_at,
            request_counter,
            last_route,
            parent_sampled,
            parent_span_id,
        })
    }

    /// Persist the resolved pre-request state immediately, so a crash
    /// mid-request still leaves consistent continuation bookkeeping.
    fn persist_resolved(&self, state: &ContinuationState, restarted: bool) {
        self.session.set(keys::TRACE_ID, state.trace_id.to_string());
        self.session
            .set(keys::TRACE_STARTED, state.started_at.to_string());
        self.session
            .set(keys::TRACE_COUNTER, state.request_counter.to_string());
        self.session
            .set(keys::TRACE_LAST_ACTION, state.last_route.clone());
        if restarted {
            self.session.remove(keys::PARENT_SAMPLED);
            self.session.remove(keys::PARENT_ID);
        }
    }
}
