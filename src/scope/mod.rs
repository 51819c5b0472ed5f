//! Ambient per-request scope: tags and breadcrumbs.
//!
//! # Responsibilities
//! - Collect diagnostic tags attached at any point of the request
//! - Record lightweight timestamped breadcrumbs (navigation, dispatch)
//!
//! # Design Decisions
//! - The scope is plain per-request state snapshotted into the envelope,
//!   not a process-wide singleton: concurrent requests never share one
//! - Breadcrumbs are annotations, not timed units; timed work is a span

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::trace::unix_now;

/// Severity of a breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Kind of breadcrumb, mirroring the usual telemetry taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbKind {
    Default,
    Navigation,
    Http,
}

/// A lightweight timestamped diagnostic annotation.
#[derive(Debug, Clone, Serialize)]
pub struct Breadcrumb {
    pub level: BreadcrumbLevel,
    pub kind: BreadcrumbKind,
    pub category: String,
    pub message: String,
    pub metadata: HashMap<String, Value>,
    pub timestamp: f64,
}

impl Breadcrumb {
    pub fn new(
        level: BreadcrumbLevel,
        kind: BreadcrumbKind,
        category: impl Into<String>,
        message: impl Into<String>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            level,
            kind,
            category: category.into(),
            message: message.into(),
            metadata,
            timestamp: unix_now(),
        }
    }
}

/// Tags and breadcrumbs accumulated over one request, snapshotted into the
/// transaction envelope at request end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scope {
    tags: HashMap<String, String>,
    breadcrumbs: Vec<Breadcrumb>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a tag; independent of transaction state.
    pub fn set_tag(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(name.into(), value.into());
    }

    pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) {
        self.breadcrumbs.push(breadcrumb);
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_overwrite_by_name() {
        let mut scope = Scope::new();
        scope.set_tag("route", "a/b");
        scope.set_tag("route", "c/d");
        assert_eq!(scope.tags().get("route").map(String::as_str), Some("c/d"));
    }

    #[test]
    fn test_breadcrumbs_preserve_order() {
        let mut scope = Scope::new();
        for message in ["first", "second"] {
            scope.add_breadcrumb(Breadcrumb::new(
                BreadcrumbLevel::Info,
                BreadcrumbKind::Navigation,
                "route",
                message,
                HashMap::new(),
            ));
        }
        let messages: Vec<_> = scope.breadcrumbs().iter().map(|b| b.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
    }
}
