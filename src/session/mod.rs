//! Session collaborator: the only state shared across requests.
//!
//! # Responsibilities
//! - Define the key-value contract the host's session layer must provide
//! - Name the keys used for trace continuation bookkeeping
//! - Provide an in-memory implementation for tests and in-process hosts
//!
//! # Design Decisions
//! - The store is injected, never ambient: one `SessionStore` instance
//!   represents one client session
//! - Values are strings; everything persisted here round-trips through its
//!   string form (ids, timestamps, counters)
//! - Store failures are the host session layer's problem; this crate
//!   assumes reads and writes succeed

pub mod memory;

pub use memory::{MemorySessionStore, SessionRegistry};

/// Session keys used for trace continuation state.
pub mod keys {
    pub const TRACE_ID: &str = "trace_id";
    pub const TRACE_STARTED: &str = "trace_started";
    pub const TRACE_COUNTER: &str = "trace_counter";
    pub const TRACE_LAST_ACTION: &str = "trace_last_action";
    pub const PARENT_SAMPLED: &str = "parent_sampled";
    pub const PARENT_ID: &str = "parent_id";
}

/// Key-value contract over one client session.
///
/// Reads and writes are atomic per key; the lifecycle performs the
/// read-then-write of the whole continuation bundle as a unit within one
/// request.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
