//! tracelink: session-linked request tracing.
//!
//! Embeds a trace/transaction/span hierarchy into a request-processing
//! framework, deciding per request whether to continue the session's
//! current distributed trace or start a fresh one, and propagating trace
//! linkage through server-side session state when no external trace
//! header exists.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────────┐
//!                  │                    TRACELINK                      │
//!                  │                                                   │
//!  Request start   │  ┌───────────┐   ┌──────────────┐   ┌─────────┐   │
//!  ────────────────┼─▶│ lifecycle │──▶│ continuation │──▶│ session │   │
//!                  │  │  (state   │   │   policy     │   │  store  │   │
//!                  │  │  machine) │   └──────────────┘   └─────────┘   │
//!                  │  │           │   ┌──────────────┐                 │
//!                  │  │           │──▶│  span stack  │◀── profile      │
//!                  │  └─────┬─────┘   └──────────────┘    adapter      │
//!                  │        │                                          │
//!  Request end     │        ▼                                          │
//!  ────────────────┼─▶ transaction envelope ──▶ sink (telemetry)       │
//!                  │                                                   │
//!                  │  Cross-cutting: config, scope (tags/breadcrumbs), │
//!                  │  metrics, axum middleware                         │
//!                  └───────────────────────────────────────────────────┘
//! ```
//!
//! One `TransactionLifecycle` exists per request; the session store is the
//! only state legitimately shared across sequential requests from the same
//! client, and the sink is the only process-wide collaborator.

// Core subsystems
pub mod config;
pub mod lifecycle;
pub mod trace;

// Collaborator contracts
pub mod session;
pub mod sink;

// Cross-cutting concerns
pub mod metrics;
pub mod middleware;
pub mod profile;
pub mod scope;

pub use config::{load_config, ConfigError, TracingConfig};
pub use lifecycle::{RequestInfo, RequestState, TransactionLifecycle};
pub use profile::{ProfileEvent, ProfileEventKind, ProfileSpanAdapter};
pub use scope::{Breadcrumb, BreadcrumbKind, BreadcrumbLevel, Scope};
pub use session::{MemorySessionStore, SessionRegistry, SessionStore};
pub use sink::{MemorySink, NoopSink, TraceSink, TransactionEnvelope};
pub use trace::{Span, SpanId, SpanStack, TraceContinuationPolicy, TraceId, Transaction};
