//! Profile log-event to span adaptation.
//!
//! # Responsibilities
//! - Convert paired begin/end profile events into span open/close calls
//!   with the events' own timestamps
//! - Tolerate begin/end pairs interleaved with unrelated events
//!
//! # Design Decisions
//! - Pairing is strictly by label, not by stream position: an `End` closes
//!   whatever `Begin` with the same label is still open
//! - An `End` with no recorded `Begin` is a silent no-op; unmatched ends
//!   must never surface an error into the host's log pipeline
//! - Plain marker events pass through untouched

use std::collections::HashMap;

use crate::lifecycle::TransactionLifecycle;
use crate::trace::Span;

/// Level of a profile log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEventKind {
    /// Opens a span labeled with the event's label.
    Begin,
    /// Closes the span opened by the matching `Begin`.
    End,
    /// Plain profiling marker; ignored by this adapter.
    Marker,
}

/// One entry of the host's profile log stream.
#[derive(Debug, Clone)]
pub struct ProfileEvent {
    pub kind: ProfileEventKind,
    pub label: String,
    /// Wall-clock time the event was observed, Unix seconds.
    pub timestamp: f64,
}

impl ProfileEvent {
    pub fn new(kind: ProfileEventKind, label: impl Into<String>, timestamp: f64) -> Self {
        Self {
            kind,
            label: label.into(),
            timestamp,
        }
    }
}

/// Converts a profile event stream into span push/pop calls on the
/// request's lifecycle.
///
/// Scoped to one export batch; spans left open by a `Begin` without an
/// `End` stay open and are dropped from the envelope when the transaction
/// finishes.
#[derive(Debug, Default)]
pub struct ProfileSpanAdapter {
    open: HashMap<String, (Span, Span)>,
}

impl ProfileSpanAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a batch of events through the adapter.
    pub fn export<I>(&mut self, lifecycle: &mut TransactionLifecycle, events: I)
    where
        I: IntoIterator<Item = ProfileEvent>,
    {
        for event in events {
            match event.kind {
                ProfileEventKind::Begin => {
                    // None when no transaction is in flight; nothing to
                    // retain then, the matching End degrades to a no-op.
                    if let Some(pair) = lifecycle.add_span(&event.label, Some(event.timestamp)) {
                        self.open.insert(event.label, pair);
                    }
                }
                ProfileEventKind::End => match self.open.remove(&event.label) {
                    Some((span, previous)) => {
                        lifecycle.finish_span(Some(span), Some(previous), Some(event.timestamp));
                    }
                    None => {
                        tracing::debug!(label = %event.label, "profile end without matching begin");
                    }
                },
                ProfileEventKind::Marker => {}
            }
        }
    }

    /// Number of begins still awaiting their end.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::TracingConfig;
    use crate::lifecycle::RequestInfo;
    use crate::session::MemorySessionStore;
    use crate::sink::MemorySink;

    fn begin(label: &str, ts: f64) -> ProfileEvent {
        ProfileEvent::new(ProfileEventKind::Begin, label, ts)
    }

    fn end(label: &str, ts: f64) -> ProfileEvent {
        ProfileEvent::new(ProfileEventKind::End, label, ts)
    }

    fn harness() -> (TransactionLifecycle, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let mut lifecycle = TransactionLifecycle::new(
            &TracingConfig::default(),
            Arc::new(MemorySessionStore::new()),
            sink.clone(),
        );
        lifecycle.on_request_start(&RequestInfo::new("report/build"));
        (lifecycle, sink)
    }

    #[test]
    fn test_pairs_by_label_across_interleaved_events() {
        let (mut lifecycle, sink) = harness();
        let mut adapter = ProfileSpanAdapter::new();

        adapter.export(
            &mut lifecycle,
            vec![
                begin("query-users", 100.0),
                ProfileEvent::new(ProfileEventKind::Marker, "checkpoint", 100.5),
                begin("render", 101.0),
                end("query-users", 102.0),
                end("render", 103.0),
            ],
        );
        assert_eq!(adapter.open_count(), 0);
        lifecycle.on_request_end();

        let tx = &sink.envelopes()[0].transaction;
        let query = tx.spans.iter().find(|s| s.op == "query-users").unwrap();
        assert_eq!(query.start, 100.0);
        assert_eq!(query.end, 102.0);
        let render = tx.spans.iter().find(|s| s.op == "render").unwrap();
        assert_eq!(render.start, 101.0);
        assert_eq!(render.end, 103.0);
    }

    #[test]
    fn test_unmatched_end_is_noop() {
        let (mut lifecycle, sink) = harness();
        let mut adapter = ProfileSpanAdapter::new();

        adapter.export(&mut lifecycle, vec![end("never-begun", 50.0)]);
        lifecycle.on_request_end();

        // Only the processing span made it into the envelope.
        assert_eq!(sink.envelopes()[0].transaction.spans.len(), 1);
    }

    #[test]
    fn test_begin_without_end_leaves_span_open() {
        let (mut lifecycle, sink) = harness();
        let mut adapter = ProfileSpanAdapter::new();

        adapter.export(&mut lifecycle, vec![begin("orphan", 10.0)]);
        assert_eq!(adapter.open_count(), 1);
        lifecycle.on_request_end();

        // The orphan span never finished, so the envelope omits it.
        assert!(sink.envelopes()[0]
            .transaction
            .spans
            .iter()
            .all(|s| s.op != "orphan"));
    }

    #[test]
    fn test_export_without_transaction_degrades() {
        let sink = Arc::new(MemorySink::new());
        let mut lifecycle = TransactionLifecycle::new(
            &TracingConfig::default(),
            Arc::new(MemorySessionStore::new()),
            sink.clone(),
        );
        let mut adapter = ProfileSpanAdapter::new();

        adapter.export(
            &mut lifecycle,
            vec![begin("no-transaction", 1.0), end("no-transaction", 2.0)],
        );
        assert_eq!(adapter.open_count(), 0);
        assert!(sink.is_empty());
    }
}
