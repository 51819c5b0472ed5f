//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tracing
//! integration. All types derive Serde traits for deserialization from
//! config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the tracing integration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TracingConfig {
    /// Groups of route identifiers considered part of the same logical
    /// workflow. Leaving a group restarts the trace; with no groups
    /// configured, continuation is never overridden.
    pub tracing_groups: Vec<Vec<String>>,

    /// Telemetry client settings (transport, identity tags).
    pub client: ClientConfig,

    /// Enabled sub-integrations.
    pub integrations: Vec<String>,
}

/// Telemetry client settings.
///
/// Everything except the DSN is opaque pass-through toward the backend
/// client; the DSN is validated once at initialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend DSN (URL). `None` disables submission.
    pub dsn: Option<String>,

    /// Environment name reported with every transaction.
    pub environment: String,

    /// Release identifier, if any.
    pub release: Option<String>,

    /// Tags attached to the scope of every request.
    pub extra_tags: HashMap<String, String>,

    /// Additional client options, forwarded untouched to the backend
    /// client.
    pub options: HashMap<String, serde_json::Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: "production".to_string(),
            release: None,
            extra_tags: HashMap::new(),
            options: HashMap::new(),
        }
    }
}

/// Sub-integration names recognized in `integrations`.
pub const KNOWN_INTEGRATIONS: &[&str] = &["request", "profile"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert!(config.tracing_groups.is_empty());
        assert!(config.client.dsn.is_none());
        assert_eq!(config.client.environment, "production");
    }

    #[test]
    fn test_deserialize_minimal_toml() {
        let config: TracingConfig = toml::from_str("").unwrap();
        assert!(config.tracing_groups.is_empty());

        let config: TracingConfig = toml::from_str(
            r#"
            tracing_groups = [["checkout/pay", "checkout/confirm"]]

            [client]
            dsn = "https://key@telemetry.example.com/42"
            environment = "staging"

            [client.extra_tags]
            region = "eu-west-1"

            [client.options]
            send_default_pii = true
            "#,
        )
        .unwrap();
        assert_eq!(config.tracing_groups.len(), 1);
        assert_eq!(config.client.environment, "staging");
        assert_eq!(
            config.client.extra_tags.get("region").map(String::as_str),
            Some("eu-west-1")
        );
        assert_eq!(
            config.client.options.get("send_default_pii"),
            Some(&serde_json::Value::Bool(true))
        );
    }
}
