//! Configuration schema definitions.
//!
//! This module defines the loader's own settings: where the store lives,
//! which key holds the application document, and how often to re-fetch it.
//! All types derive Serde traits for deserialization from a TOML file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings for the configuration loader.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Store location and request limits.
    pub store: StoreConfig,

    /// Background refresh settings.
    pub reload: ReloadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Store node addresses, tried in order (e.g., "127.0.0.1:2379").
    pub endpoints: Vec<String>,

    /// Key holding the JSON configuration document.
    pub key: String,

    /// Upper bound for establishing a session, in milliseconds.
    pub dial_timeout_ms: u64,

    /// Upper bound for a single read, in milliseconds.
    pub request_timeout_ms: u64,
}

impl StoreConfig {
    /// Build settings for the given endpoints and key with default timeouts.
    pub fn new<I, S>(endpoints: I, key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["127.0.0.1:2379".to_string()],
            key: String::new(),
            dial_timeout_ms: 10_000,
            request_timeout_ms: 5_000,
        }
    }
}

/// Background refresh settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReloadConfig {
    /// Pause between refresh ticks, in milliseconds.
    pub delay_ms: u64,
}

impl ReloadConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self { delay_ms: 5_000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Split a comma-separated endpoint list ("a:2379,b:2379") into entries.
///
/// Blank entries are dropped.
pub fn split_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
