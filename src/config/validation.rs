//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check tracing groups are well-formed (non-empty, no blank or
//!   duplicate routes within a group)
//! - Validate the DSN parses as a URL
//! - Reject unknown sub-integration names
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation runs once at initialization and is fatal there; it never
//!   runs on the request path

use thiserror::Error;
use url::Url;

use crate::config::schema::{TracingConfig, KNOWN_INTEGRATIONS};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("tracing group {index} is empty")]
    EmptyGroup { index: usize },

    #[error("tracing group {index} contains a blank route")]
    BlankRoute { index: usize },

    #[error("tracing group {index} lists route '{route}' more than once")]
    DuplicateRoute { index: usize, route: String },

    #[error("client DSN '{dsn}' is not a valid URL")]
    InvalidDsn { dsn: String },

    #[error("unknown integration '{name}'")]
    UnknownIntegration { name: String },
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &TracingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, group) in config.tracing_groups.iter().enumerate() {
        if group.is_empty() {
            errors.push(ValidationError::EmptyGroup { index });
            continue;
        }
        for (position, route) in group.iter().enumerate() {
            if route.trim().is_empty() {
                errors.push(ValidationError::BlankRoute { index });
            } else if group[..position].contains(route) {
                errors.push(ValidationError::DuplicateRoute {
                    index,
                    route: route.clone(),
                });
            }
        }
    }

    if let Some(dsn) = &config.client.dsn {
        if Url::parse(dsn).is_err() {
            errors.push(ValidationError::InvalidDsn { dsn: dsn.clone() });
        }
    }

    for name in &config.integrations {
        if !KNOWN_INTEGRATIONS.contains(&name.as_str()) {
            errors.push(ValidationError::UnknownIntegration { name: name.clone() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
