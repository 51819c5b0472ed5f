//! Trace core: identifiers, spans, transactions and the continuation
//! policy.
//!
//! # Data Flow
//! ```text
//! request start
//!     → continuation.rs (continue or restart the session's trace)
//!     → transaction.rs (root span for this request)
//!     → span.rs (active-span slot, nested spans)
//! request end
//!     → transaction snapshot → sink
//! ```
//!
//! # Design Decisions
//! - One active-span slot per request; nothing here is shared across
//!   concurrent requests
//! - The continuation policy is pure; all session reads/writes happen in
//!   the lifecycle

pub mod continuation;
pub mod id;
pub mod span;
pub mod transaction;

pub use continuation::{ContinuationState, Resolution, TraceContinuationPolicy};
pub use id::{IdParseError, SpanId, TraceId};
pub use span::{unix_now, Span, SpanRecord, SpanStack};
pub use transaction::{FinishedTransaction, Transaction, TransactionContext};
