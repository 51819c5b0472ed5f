//! Trace continuation: continue the session's current trace or restart.
//!
//! # Responsibilities
//! - Decide, at the start of each request, whether the new transaction
//!   joins the previously persisted trace or starts a fresh one
//! - Apply the configured route-group rule: leaving a group of related
//!   routes forces a restart
//!
//! # Design Decisions
//! - The policy is a pure function of the persisted state, the current
//!   route and the clock; it never touches the session store itself
//! - Routes outside every configured group never force a restart on their
//!   own; with no groups configured the trace accumulates until the
//!   session ends
//! - A restart discards the stored parent-sampled/parent-span linkage:
//!   it described a lineage that no longer applies

use crate::trace::id::{SpanId, TraceId};

/// Per-session trace continuation bookkeeping.
///
/// Read from the session store before the request and written back in
/// resolved form immediately after the decision, so a crash mid-request
/// still leaves consistent state. `last_route` is the route of the request
/// the state was resolved for.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationState {
    pub trace_id: TraceId,
    /// Wall-clock time the trace was first opened, Unix seconds.
    pub started_at: f64,
    /// Number of requests folded into this trace so far, >= 1.
    pub request_counter: u64,
    pub last_route: String,
    pub parent_sampled: Option<bool>,
    pub parent_span_id: Option<SpanId>,
}

/// Outcome of a continuation decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The state the new transaction should run under, ready to persist.
    pub state: ContinuationState,
    /// Whether a new trace was minted. Informational: feeds a tag and a
    /// metric, never changes transaction open/close behavior.
    pub restarted: bool,
}

/// Decides whether each request continues the session's trace.
#[derive(Debug, Clone, Default)]
pub struct TraceContinuationPolicy {
    groups: Vec<Vec<String>>,
}

impl TraceContinuationPolicy {
    /// Build a policy from the configured route groups. Groups are
    /// read-only for the lifetime of the policy.
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self { groups }
    }

    /// Resolve the trace the next transaction belongs to.
    ///
    /// `persisted` is the continuation state stored by the previous request
    /// from this session, absent on a fresh session. `now` seeds
    /// `started_at` when a new trace is minted.
    pub fn resolve(
        &self,
        persisted: Option<&ContinuationState>,
        route: &str,
        now: f64,
    ) -> Resolution {
        if let Some(previous) = persisted {
            if !self.leaves_group(&previous.last_route, route) {
                return Resolution {
                    state: ContinuationState {
                        trace_id: previous.trace_id,
                        started_at: previous.started_at,
                        request_counter: previous.request_counter + 1,
                        last_route: route.to_string(),
                        parent_sampled: previous.parent_sampled,
                        parent_span_id: previous.parent_span_id,
                    },
                    restarted: false,
                };
            }
            tracing::debug!(
                last_route = %previous.last_route,
                route,
                "route left its tracing group, restarting trace"
            );
        }

        Resolution {
            state: ContinuationState {
                trace_id: TraceId::generate(),
                started_at: now,
                request_counter: 1,
                last_route: route.to_string(),
                parent_sampled: None,
                parent_span_id: None,
            },
            restarted: true,
        }
    }

    /// True when `last_route` belongs to some configured group that does
    /// not also contain `route`.
    fn leaves_group(&self, last_route: &str, route: &str) -> bool {
        self.groups
            .iter()
            .filter(|group| group.iter().any(|member| member == last_route))
            .any(|group| !group.iter().any(|member| member == route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(route: &str, counter: u64) -> ContinuationState {
        ContinuationState {
            trace_id: TraceId::generate(),
            started_at: 1_000.0,
            request_counter: counter,
            last_route: route.to_string(),
            parent_sampled: Some(true),
            parent_span_id: Some(SpanId::generate()),
        }
    }

    fn grouped_policy() -> TraceContinuationPolicy {
        TraceContinuationPolicy::new(vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["C".to_string(), "D".to_string()],
        ])
    }

    #[test]
    fn test_fresh_session_restarts() {
        let policy = TraceContinuationPolicy::default();
        let resolution = policy.resolve(None, "checkout/pay", 2_000.0);

        assert!(resolution.restarted);
        assert_eq!(resolution.state.request_counter, 1);
        assert_eq!(resolution.state.started_at, 2_000.0);
        assert_eq!(resolution.state.last_route, "checkout/pay");
        assert_eq!(resolution.state.parent_sampled, None);
        assert_eq!(resolution.state.parent_span_id, None);
    }

    #[test]
    fn test_no_groups_always_continues() {
        let policy = TraceContinuationPolicy::default();
        let mut state = persisted("checkout/pay", 1);
        let trace_id = state.trace_id;

        for (i, route) in ["a", "b", "c", "d"].iter().enumerate() {
            let resolution = policy.resolve(Some(&state), route, 9_999.0);
            assert!(!resolution.restarted);
            assert_eq!(resolution.state.trace_id, trace_id);
            assert_eq!(resolution.state.started_at, 1_000.0);
            assert_eq!(resolution.state.request_counter, i as u64 + 2);
            state = resolution.state;
        }
    }

    #[test]
    fn test_staying_inside_group_continues() {
        let policy = grouped_policy();

        // A -> B -> A never restarts.
        let state = persisted("A", 1);
        let resolution = policy.resolve(Some(&state), "B", 0.0);
        assert!(!resolution.restarted);
        let resolution = policy.resolve(Some(&resolution.state), "A", 0.0);
        assert!(!resolution.restarted);
        assert_eq!(resolution.state.request_counter, 3);
    }

    #[test]
    fn test_leaving_group_restarts() {
        let policy = grouped_policy();
        let state = persisted("A", 4);

        // A -> C leaves group {A,B}.
        let resolution = policy.resolve(Some(&state), "C", 5_000.0);
        assert!(resolution.restarted);
        assert_ne!(resolution.state.trace_id, state.trace_id);
        assert_eq!(resolution.state.request_counter, 1);
        assert_eq!(resolution.state.started_at, 5_000.0);
        assert_eq!(resolution.state.parent_sampled, None);
        assert_eq!(resolution.state.parent_span_id, None);
    }

    #[test]
    fn test_ungrouped_previous_route_never_restarts() {
        let policy = grouped_policy();

        // X -> A: X belongs to no group, continuation applies.
        let state = persisted("X", 2);
        let resolution = policy.resolve(Some(&state), "A", 0.0);
        assert!(!resolution.restarted);
        assert_eq!(resolution.state.request_counter, 3);
    }

    #[test]
    fn test_grouped_to_ungrouped_restarts() {
        let policy = grouped_policy();

        // A -> X: A is grouped and X is not in A's group.
        let state = persisted("A", 2);
        let resolution = policy.resolve(Some(&state), "X", 0.0);
        assert!(resolution.restarted);
    }

    #[test]
    fn test_continuation_carries_parent_linkage() {
        let policy = grouped_policy();
        let state = persisted("A", 1);
        let resolution = policy.resolve(Some(&state), "B", 0.0);

        assert_eq!(resolution.state.parent_sampled, state.parent_sampled);
        assert_eq!(resolution.state.parent_span_id, state.parent_span_id);
    }
}
