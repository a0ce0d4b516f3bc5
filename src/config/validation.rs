//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject empty endpoint lists and blank keys
//! - Validate value ranges (timeouts and reload delay > 0, parseable addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LoaderConfig → Result<(), Vec<ValidationError>>
//! - Runs before settings are handed to the loader

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::LoaderConfig;

/// A single semantic problem found in the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "store.key").
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate loader settings, collecting every problem.
pub fn validate_config(config: &LoaderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.store.endpoints.is_empty() {
        errors.push(ValidationError::new("store.endpoints", "at least one endpoint is required"));
    }
    for endpoint in &config.store.endpoints {
        if endpoint.trim().is_empty() {
            errors.push(ValidationError::new("store.endpoints", "endpoint must not be blank"));
        }
    }

    if config.store.key.trim().is_empty() {
        errors.push(ValidationError::new("store.key", "key must not be empty"));
    }

    if config.store.dial_timeout_ms == 0 {
        errors.push(ValidationError::new("store.dial_timeout_ms", "must be greater than zero"));
    }
    if config.store.request_timeout_ms == 0 {
        errors.push(ValidationError::new("store.request_timeout_ms", "must be greater than zero"));
    }
    if config.reload.delay_ms == 0 {
        errors.push(ValidationError::new("reload.delay_ms", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
