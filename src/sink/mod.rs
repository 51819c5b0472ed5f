//! Telemetry sink collaborator.
//!
//! # Responsibilities
//! - Define the contract for handing finished transactions to a backend
//! - Provide a no-op sink and an in-memory recording sink
//!
//! # Design Decisions
//! - Wire serialization and transport are out of scope; embedders plug in
//!   their own `TraceSink` for real submission
//! - Submission is synchronous and infallible from the caller's view:
//!   tracing failures must never fail the request

use std::sync::Mutex;

use serde::Serialize;

use crate::scope::Scope;
use crate::trace::FinishedTransaction;

/// A finished transaction plus the scope accumulated during its request.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionEnvelope {
    pub transaction: FinishedTransaction,
    pub scope: Scope,
}

/// Receives finished transactions. One per process, shared across requests.
pub trait TraceSink: Send + Sync {
    fn submit(&self, envelope: TransactionEnvelope);
}

/// Discards everything. The default when no backend is wired up.
#[derive(Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn submit(&self, _envelope: TransactionEnvelope) {}
}

/// Records envelopes in memory, for tests and embedders that flush
/// elsewhere.
#[derive(Debug, Default)]
pub struct MemorySink {
    envelopes: Mutex<Vec<TransactionEnvelope>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything submitted so far.
    pub fn envelopes(&self) -> Vec<TransactionEnvelope> {
        self.envelopes.lock().expect("sink mutex poisoned").clone()
    }

    /// Drain recorded envelopes.
    pub fn take(&self) -> Vec<TransactionEnvelope> {
        std::mem::take(&mut *self.envelopes.lock().expect("sink mutex poisoned"))
    }

    pub fn len(&self) -> usize {
        self.envelopes.lock().expect("sink mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceSink for MemorySink {
    fn submit(&self, envelope: TransactionEnvelope) {
        self.envelopes
            .lock()
            .expect("sink mutex poisoned")
            .push(envelope);
    }
}
