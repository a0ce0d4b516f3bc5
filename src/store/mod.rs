//! Key-value store subsystem.
//!
//! # Data Flow
//! ```text
//! KvStore::connect(dial_timeout)
//!     → KvSession (one endpoint, released on drop)
//!     → KvSession::get(key)
//!     → Vec<KeyValue> (possibly empty)
//! ```
//!
//! # Implementations
//! - `etcd.rs`: etcd v3 JSON gateway over HTTP, ordered endpoint failover
//! - `memory.rs`: in-process store with fault injection
//!
//! # Design Decisions
//! - Sessions are scoped values; dropping one closes it on every exit path
//! - Errors keep the store's own classification (canceled, deadline, empty key)
//!   so callers can label failures without string matching

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod etcd;
pub mod memory;

pub use etcd::EtcdStore;
pub use memory::{Fault, MemoryStore};

/// A single entry returned by a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Store revision of the last modification of this key.
    pub mod_revision: i64,
}

/// Errors that can occur while talking to a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No endpoints were supplied.
    #[error("No store endpoints configured")]
    NoEndpoints,

    /// An endpoint could not be turned into a URL.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Every endpoint failed the connection probe.
    #[error("No reachable endpoint among [{endpoints}]: {reason}")]
    Unreachable { endpoints: String, reason: String },

    /// Establishing a session took longer than the dial timeout.
    #[error("Dial timeout after {0:?}")]
    DialTimeout(Duration),

    /// The request was aborted before completion.
    #[error("Request canceled: {0}")]
    Canceled(String),

    /// The store gave up on the request.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The key argument was empty.
    #[error("Key is not provided")]
    EmptyKey,

    /// HTTP-level failure talking to a node.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with an error status.
    #[error("Store error (code {code}): {message}")]
    Server { code: i32, message: String },

    /// The node answered with a payload we could not interpret.
    #[error("Malformed store response: {0}")]
    Malformed(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A store that can hand out read sessions.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Open a session.
    ///
    /// Stores with several nodes try them in order and bound each attempt by
    /// `dial_timeout`, so a silent node costs at most one dial timeout.
    async fn connect(&self, dial_timeout: Duration) -> StoreResult<Box<dyn KvSession>>;
}

/// An open session against one store node.
///
/// Dropping the session releases it.
#[async_trait]
pub trait KvSession: Send + Sync {
    /// Read every entry stored under exactly `key`.
    async fn get(&self, key: &str) -> StoreResult<Vec<KeyValue>>;
}
