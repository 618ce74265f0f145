//! NATS configuration

use serde::{Deserialize, Serialize};

/// NATS connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Subject prefix, isolates deployments (e.g. "prod", "dev")
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Optional credentials file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
}

fn default_prefix() -> String {
    "prod".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["localhost:4222".to_string()],
            prefix: default_prefix(),
            credentials_file: None,
        }
    }
}

impl NatsConfig {
    /// Parse servers from a comma-separated URL list.
    pub fn from_url(url: impl AsRef<str>, prefix: impl Into<String>) -> Self {
        let servers = url
            .as_ref()
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();
        Self {
            servers,
            prefix: prefix.into(),
            credentials_file: None,
        }
    }
}
