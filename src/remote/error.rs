//! Load failure taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Why a single load did not produce a new snapshot.
///
/// The variants exist for diagnostics; callers normally treat every variant
/// the same way.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No session could be established with the store.
    #[error("Failed to connect to store: {0}")]
    Connect(#[source] StoreError),

    /// The request was aborted by someone else.
    #[error("Request canceled by another task: {0}")]
    Canceled(#[source] StoreError),

    /// The request did not complete in time.
    ///
    /// `source` is set when the store itself gave up, and is `None` when the
    /// local request timeout fired first.
    #[error("Request timed out after {after:?}{}", store_detail(.source))]
    Timeout {
        after: Duration,
        #[source]
        source: Option<StoreError>,
    },

    /// The store client rejected the key.
    #[error("Invalid key: {0}")]
    InvalidKey(#[source] StoreError),

    /// Any other store or transport failure.
    #[error("Store node error: {0}")]
    Store(#[source] StoreError),

    /// The store was reached but holds nothing at the key.
    #[error("No configuration found at {key}")]
    NotFound { key: String },

    /// The stored bytes are not a valid document for the target type.
    #[error("Failed to decode configuration: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LoadError {
    /// Classify a failed read.
    pub(crate) fn from_request(err: StoreError, request_timeout: Duration) -> Self {
        match err {
            StoreError::Canceled(_) => LoadError::Canceled(err),
            StoreError::DeadlineExceeded(_) => LoadError::Timeout {
                after: request_timeout,
                source: Some(err),
            },
            StoreError::EmptyKey => LoadError::InvalidKey(err),
            other => LoadError::Store(other),
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Connect(_) => "connect",
            LoadError::Canceled(_) => "canceled",
            LoadError::Timeout { .. } => "timeout",
            LoadError::InvalidKey(_) => "invalid_key",
            LoadError::Store(_) => "store",
            LoadError::NotFound { .. } => "not_found",
            LoadError::Decode(_) => "decode",
        }
    }
}

fn store_detail(source: &Option<StoreError>) -> String {
    match source {
        Some(err) => format!(" (store: {})", err),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_request_classification() {
        let cases = [
            (StoreError::Canceled("x".into()), "canceled"),
            (StoreError::DeadlineExceeded("x".into()), "timeout"),
            (StoreError::EmptyKey, "invalid_key"),
            (StoreError::Transport("reset".into()), "store"),
            (
                StoreError::Server {
                    code: 14,
                    message: "unavailable".into(),
                },
                "store",
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(LoadError::from_request(err, TIMEOUT).kind(), kind);
        }
    }

    #[test]
    fn test_messages_name_the_cause() {
        let err = LoadError::NotFound {
            key: "/cfg/svc".into(),
        };
        assert_eq!(err.to_string(), "No configuration found at /cfg/svc");

        let err = LoadError::Timeout {
            after: TIMEOUT,
            source: None,
        };
        assert_eq!(err.to_string(), "Request timed out after 5s");
    }

    #[test]
    fn test_store_deadline_keeps_its_source() {
        use std::error::Error as _;

        let err = LoadError::from_request(
            StoreError::DeadlineExceeded("context deadline exceeded".into()),
            TIMEOUT,
        );
        assert_eq!(err.kind(), "timeout");
        assert_eq!(
            err.to_string(),
            "Request timed out after 5s (store: Deadline exceeded: context deadline exceeded)"
        );
        assert!(matches!(
            err.source().and_then(|s| s.downcast_ref::<StoreError>()),
            Some(StoreError::DeadlineExceeded(msg)) if msg == "context deadline exceeded"
        ));
    }
}
