//! Trace and span identifiers.
//!
//! # Responsibilities
//! - Generate fresh 128-bit trace ids and 64-bit span ids
//! - Round-trip both through their session-persisted string form
//!
//! # Design Decisions
//! - Trace ids render as 32 lowercase hex chars (no hyphens) so the
//!   persisted form is compact and unambiguous
//! - Span ids are never zero; zero is reserved as "absent" on the wire

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an identifier cannot be reconstructed from its
/// persisted string form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid trace id: {0}")]
    TraceId(String),

    #[error("invalid span id: {0}")]
    SpanId(String),
}

/// Identifier of a logical trace, shared by every transaction folded into it.
///
/// Read-only once created; a new one is minted only when the continuation
/// policy decides to restart the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Mint a fresh random trace id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

impl FromStr for TraceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| IdParseError::TraceId(s.to_string()))
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identifier of a single span within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Mint a fresh random non-zero span id.
    pub fn generate() -> Self {
        loop {
            let value = fastrand::u64(..);
            if value != 0 {
                return Self(value);
            }
        }
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SpanId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // from_str_radix tolerates a leading '+', which would break the
        // Display round-trip; only plain hex digits are acceptable.
        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdParseError::SpanId(s.to_string()));
        }
        let value = u64::from_str_radix(s, 16).map_err(|_| IdParseError::SpanId(s.to_string()))?;
        if value == 0 {
            return Err(IdParseError::SpanId(s.to_string()));
        }
        Ok(Self(value))
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
