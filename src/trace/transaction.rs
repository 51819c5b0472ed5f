//! Transactions: the root span of one request's processing.
//!
//! # Responsibilities
//! - Build a transaction from the resolved continuation context
//! - Own the registry of child spans opened during the request
//! - Produce the finished snapshot handed to the telemetry sink
//!
//! # Design Decisions
//! - No sampling decision is made here; `sampled` only forwards the
//!   parent-sampled flag inherited from the previous transaction
//! - Unfinished child spans are dropped from the snapshot rather than
//!   closed implicitly; closing spans is the caller's contract

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::trace::id::{SpanId, TraceId};
use crate::trace::span::{unix_now, Span, SpanRecord};

/// Everything needed to start a transaction, assembled by the lifecycle
/// from the resolved continuation state.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    /// Transaction name: the route identifier.
    pub name: String,
    /// Operation kind, e.g. `http.request`.
    pub op: String,
    pub trace_id: TraceId,
    /// Sampling decision inherited from the previous transaction, if any.
    pub parent_sampled: Option<bool>,
    /// Root span of the previous transaction, linking this one into the
    /// continued trace.
    pub parent_span_id: Option<SpanId>,
    pub tags: HashMap<String, String>,
}

/// Immutable snapshot of a finished transaction plus its finished child
/// spans.
#[derive(Debug, Clone, Serialize)]
pub struct FinishedTransaction {
    pub name: String,
    pub op: String,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub sampled: Option<bool>,
    pub start: f64,
    pub end: f64,
    pub tags: HashMap<String, String>,
    pub spans: Vec<SpanRecord>,
}

/// The distinguished root span representing one request within a trace.
///
/// Owns the lifetime of every span opened during the request.
#[derive(Debug)]
pub struct Transaction {
    root: Span,
    name: String,
    op: String,
    sampled: Option<bool>,
    tags: HashMap<String, String>,
    children: Arc<Mutex<Vec<Span>>>,
}

impl Transaction {
    /// Start a transaction at `start` (defaults to now).
    pub fn start(context: TransactionContext, start: Option<f64>) -> Self {
        let children = Arc::new(Mutex::new(Vec::new()));
        let root = Span::new_root(
            context.op.clone(),
            context.trace_id,
            context.parent_span_id,
            start.unwrap_or_else(unix_now),
            Arc::downgrade(&children),
        );
        Self {
            root,
            name: context.name,
            op: context.op,
            sampled: context.parent_sampled,
            tags: context.tags,
            children,
        }
    }

    /// Handle to the root span, installed as the current active span.
    pub fn root(&self) -> &Span {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace_id(&self) -> TraceId {
        self.root.trace_id()
    }

    /// Root span id, persisted as `parent_id` for the next request.
    pub fn span_id(&self) -> SpanId {
        self.root.span_id()
    }

    /// Forwarded parent-sampled flag; `None` when the trace was restarted.
    pub fn sampled(&self) -> Option<bool> {
        self.sampled
    }

    pub fn set_tag(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(name.into(), value.into());
    }

    /// Finish the transaction at `end` (defaults to now) and snapshot it.
    ///
    /// Child spans still open at this point are omitted from the snapshot.
    pub fn finish(self, end: Option<f64>) -> FinishedTransaction {
        self.root.finish(end);
        let spans = self
            .children
            .lock()
            .expect("transaction children mutex poisoned")
            .iter()
            .filter_map(Span::record)
            .collect();
        let root = self
            .root
            .record()
            .expect("transaction root finished above");
        FinishedTransaction {
            name: self.name,
            op: self.op,
            trace_id: root.trace_id,
            span_id: root.span_id,
            parent_span_id: root.parent_span_id,
            sampled: self.sampled,
            start: root.start,
            end: root.end,
            tags: self.tags,
            spans,
        }
    }
}
