//! In-process store.
//!
//! # Responsibilities
//! - Hold key → value entries with etcd-like revisions
//! - Inject failures into subsequent connects and reads
//! - Count sessions and requests so callers can check for leaks and re-fetches

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::store::{KeyValue, KvSession, KvStore, StoreError, StoreResult};

/// Failure mode applied to the next operations.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None = 0,
    /// `connect` fails as if no node answered.
    Unreachable = 1,
    /// `get` never completes.
    Hang = 2,
    /// `get` reports a canceled request.
    Canceled = 3,
    /// `get` reports a store-side deadline.
    DeadlineExceeded = 4,
    /// `get` rejects the key.
    EmptyKey = 5,
    /// `get` reports an unavailable node.
    Unavailable = 6,
}

impl From<u8> for Fault {
    fn from(val: u8) -> Self {
        match val {
            1 => Fault::Unreachable,
            2 => Fault::Hang,
            3 => Fault::Canceled,
            4 => Fault::DeadlineExceeded,
            5 => Fault::EmptyKey,
            6 => Fault::Unavailable,
            _ => Fault::None,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    entries: DashMap<String, (Vec<u8>, i64)>,
    revision: AtomicI64,
    fault: AtomicU8,
    connects: AtomicU64,
    requests: AtomicU64,
    open_sessions: AtomicUsize,
}

/// A thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Shared>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, returning the new revision.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> i64 {
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.entries.insert(key.into(), (value.into(), revision));
        revision
    }

    /// Remove `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.inner.entries.remove(key).is_some();
        if removed {
            self.inner.revision.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    /// Apply `fault` to every following operation until cleared.
    pub fn inject(&self, fault: Fault) {
        self.inner.fault.store(fault as u8, Ordering::SeqCst);
    }

    pub fn clear_fault(&self) {
        self.inject(Fault::None);
    }

    pub fn fault(&self) -> Fault {
        Fault::from(self.inner.fault.load(Ordering::SeqCst))
    }

    /// Number of successful `connect` calls so far.
    pub fn connects(&self) -> u64 {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Number of `get` calls so far.
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Sessions handed out and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn connect(&self, dial_timeout: Duration) -> StoreResult<Box<dyn KvSession>> {
        if self.fault() == Fault::Unreachable {
            return Err(StoreError::Unreachable {
                endpoints: "memory".to_string(),
                reason: format!("injected fault, gave up after {:?}", dial_timeout),
            });
        }

        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            inner: self.inner.clone(),
        }))
    }
}

struct MemorySession {
    inner: Arc<Shared>,
}

#[async_trait]
impl KvSession for MemorySession {
    async fn get(&self, key: &str) -> StoreResult<Vec<KeyValue>> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        match Fault::from(self.inner.fault.load(Ordering::SeqCst)) {
            Fault::Hang => std::future::pending::<()>().await,
            Fault::Canceled => return Err(StoreError::Canceled("injected fault".to_string())),
            Fault::DeadlineExceeded => {
                return Err(StoreError::DeadlineExceeded("injected fault".to_string()))
            }
            Fault::EmptyKey => return Err(StoreError::EmptyKey),
            Fault::Unavailable => {
                return Err(StoreError::Server {
                    code: 14,
                    message: "injected fault: node unavailable".to_string(),
                })
            }
            Fault::None | Fault::Unreachable => {}
        }

        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        Ok(self
            .inner
            .entries
            .get(key)
            .map(|entry| {
                let (value, mod_revision) = entry.value();
                vec![KeyValue {
                    key: key.as_bytes().to_vec(),
                    value: value.clone(),
                    mod_revision: *mod_revision,
                }]
            })
            .unwrap_or_default())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}
