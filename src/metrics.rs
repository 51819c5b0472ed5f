//! Metric recording helpers.
//!
//! # Responsibilities
//! - Count trace restarts vs continuations per decision
//! - Count finished transactions
//!
//! # Design Decisions
//! - Uses the `metrics` facade only; installing a recorder/exporter is the
//!   host's job, so these calls are no-ops until one is installed

/// Record a continuation decision.
pub fn record_trace_decision(restarted: bool) {
    if restarted {
        metrics::counter!("tracelink_trace_restarts_total").increment(1);
    } else {
        metrics::counter!("tracelink_trace_continuations_total").increment(1);
    }
}

/// Record a finished transaction.
pub fn record_transaction(name: &str) {
    metrics::counter!("tracelink_transactions_total", "transaction" => name.to_string())
        .increment(1);
}
