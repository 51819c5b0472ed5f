//! Spans and the per-request active-span slot.
//!
//! # Responsibilities
//! - Represent one timed unit of work (`Span`)
//! - Maintain the single "currently active span" slot (`SpanStack`)
//! - Enforce parent-by-construction: a span's parent is whatever span was
//!   active when it was opened
//!
//! # Design Decisions
//! - `Span` is a cheap cloneable handle (`Arc`) so the stack, the profile
//!   adapter and the transaction can all refer to the same span
//! - The slot is request-scoped state; it is never shared across requests,
//!   so no locking beyond the span's own interior mutability is needed
//! - Pushing with no active span is a silent no-op: instrumentation must
//!   never break request processing

use std::sync::{Arc, Mutex, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::trace::id::{SpanId, TraceId};

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Immutable snapshot of a finished span, as handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanRecord {
    pub op: String,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug)]
struct SpanInner {
    op: String,
    trace_id: TraceId,
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
    start: f64,
    end: Mutex<Option<f64>>,
}

/// A timed unit of work nested under a transaction or another span.
///
/// Cloning produces another handle to the same span.
#[derive(Debug, Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
    /// Registry of every span opened under the owning transaction, used to
    /// assemble the envelope at transaction finish. Weak: the transaction
    /// owns the registry, spans may outlive it harmlessly.
    registry: Weak<Mutex<Vec<Span>>>,
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.inner.span_id == other.inner.span_id
    }
}

impl Span {
    pub(crate) fn new_root(
        op: impl Into<String>,
        trace_id: TraceId,
        parent_span_id: Option<SpanId>,
        start: f64,
        registry: Weak<Mutex<Vec<Span>>>,
    ) -> Self {
        Self {
            inner: Arc::new(SpanInner {
                op: op.into(),
                trace_id,
                span_id: SpanId::generate(),
                parent_span_id,
                start,
                end: Mutex::new(None),
            }),
            registry,
        }
    }

    /// Open a child span under this one, registering it with the owning
    /// transaction's registry.
    pub fn start_child(&self, op: impl Into<String>, start: Option<f64>) -> Span {
        let child = Span {
            inner: Arc::new(SpanInner {
                op: op.into(),
                trace_id: self.inner.trace_id,
                span_id: SpanId::generate(),
                parent_span_id: Some(self.inner.span_id),
                start: start.unwrap_or_else(unix_now),
                end: Mutex::new(None),
            }),
            registry: self.registry.clone(),
        };
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .expect("span registry mutex poisoned")
                .push(child.clone());
        }
        child
    }

    /// Mark the span finished. The first recorded end timestamp wins;
    /// finishing an already-finished span is ignored.
    pub fn finish(&self, end: Option<f64>) {
        let mut slot = self.inner.end.lock().expect("span end mutex poisoned");
        if slot.is_some() {
            tracing::debug!(op = %self.inner.op, span_id = %self.inner.span_id, "span already finished");
            return;
        }
        *slot = Some(end.unwrap_or_else(unix_now));
    }

    pub fn is_finished(&self) -> bool {
        self.inner.end.lock().expect("span end mutex poisoned").is_some()
    }

    pub fn op(&self) -> &str {
        &self.inner.op
    }

    pub fn trace_id(&self) -> TraceId {
        self.inner.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.inner.span_id
    }

    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.inner.parent_span_id
    }

    pub fn start_timestamp(&self) -> f64 {
        self.inner.start
    }

    /// Snapshot the span for the envelope. Returns `None` while unfinished.
    pub fn record(&self) -> Option<SpanRecord> {
        let end = (*self.inner.end.lock().expect("span end mutex poisoned"))?;
        Some(SpanRecord {
            op: self.inner.op.clone(),
            trace_id: self.inner.trace_id,
            span_id: self.inner.span_id,
            parent_span_id: self.inner.parent_span_id,
            start: self.inner.start,
            end,
        })
    }
}

/// The single mutable "current active span" slot for one request.
#[derive(Debug, Default)]
pub struct SpanStack {
    current: Option<Span>,
}

impl SpanStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active span, if any.
    pub fn current(&self) -> Option<&Span> {
        self.current.as_ref()
    }

    /// Seed or clear the slot. Used by the lifecycle to install the
    /// transaction root at request start and tear down at request end.
    pub fn replace(&mut self, span: Option<Span>) -> Option<Span> {
        std::mem::replace(&mut self.current, span)
    }

    /// Start a child span under the current one and make it active.
    ///
    /// Returns `(new, previous)` on success, or `None` when no span is
    /// active to parent under - pushing without a transaction in flight is
    /// a no-op, not an error.
    pub fn push(&mut self, op: &str, start: Option<f64>) -> Option<(Span, Span)> {
        let previous = self.current.clone()?;
        let span = previous.start_child(op, start);
        self.current = Some(span.clone());
        Some((span, previous))
    }

    /// Finish a span and optionally restore a saved previous span as
    /// active.
    ///
    /// With `span` omitted the current active span is finished. When
    /// `restore_to` is omitted the slot is left untouched; callers that
    /// need strict nesting must supply the span saved at push time.
    /// A pop with nothing to finish is a silent no-op.
    pub fn pop(&mut self, span: Option<Span>, restore_to: Option<Span>, end: Option<f64>) {
        let target = match span.or_else(|| self.current.clone()) {
            Some(target) => target,
            None => {
                tracing::debug!("no active span to finish");
                return;
            }
        };
        target.finish(end);
        if restore_to.is_some() {
            self.current = restore_to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn root() -> (Span, Arc<Mutex<Vec<Span>>>) {
        let registry = Arc::new(Mutex::new(Vec::new()));
        let span = Span::new_root(
            "http.request",
            TraceId::generate(),
            None,
            1_000.0,
            Arc::downgrade(&registry),
        );
        (span, registry)
    }

    #[test]
    fn test_push_without_active_span_is_noop() {
        let mut stack = SpanStack::new();
        assert!(stack.push("db.query", None).is_none());
        assert!(stack.current().is_none());
    }

    #[test]
    fn test_push_sets_current_and_parent() {
        let (span, registry) = root();
        let mut stack = SpanStack::new();
        stack.replace(Some(span.clone()));

        let (child, previous) = stack.push("db.query", Some(1_001.0)).unwrap();
        assert_eq!(previous, span);
        assert_eq!(child.parent_span_id(), Some(span.span_id()));
        assert_eq!(child.trace_id(), span.trace_id());
        assert_eq!(stack.current(), Some(&child));
        assert_eq!(registry.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_pop_restores_previous() {
        let (span, _registry) = root();
        let mut stack = SpanStack::new();
        stack.replace(Some(span.clone()));

        let (child, previous) = stack.push("db.query", None).unwrap();
        stack.pop(Some(child.clone()), Some(previous), Some(1_002.0));

        assert!(child.is_finished());
        assert_eq!(stack.current(), Some(&span));
        assert_eq!(child.record().unwrap().end, 1_002.0);
    }

    #[test]
    fn test_pop_without_restore_leaves_slot() {
        let (span, _registry) = root();
        let mut stack = SpanStack::new();
        stack.replace(Some(span.clone()));

        let (child, _previous) = stack.push("db.query", None).unwrap();
        stack.pop(None, None, None);

        assert!(child.is_finished());
        assert_eq!(stack.current(), Some(&child));
    }

    #[test]
    fn test_pop_on_empty_stack_is_noop() {
        let mut stack = SpanStack::new();
        stack.pop(None, None, None);
        assert!(stack.current().is_none());
    }

    #[test]
    fn test_double_finish_keeps_first_end() {
        let (span, _registry) = root();
        span.finish(Some(2_000.0));
        span.finish(Some(3_000.0));
        assert_eq!(span.record().unwrap().end, 2_000.0);
    }

    #[test]
    fn test_record_none_while_unfinished() {
        let (span, _registry) = root();
        assert!(span.record().is_none());
    }
}
