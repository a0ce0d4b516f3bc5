//! The configuration loader handle.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::{LoaderConfig, ReloadConfig, StoreConfig};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::remote::error::LoadError;
use crate::remote::fetch::{load_once, Fetched};
use crate::remote::poller;
use crate::store::{EtcdStore, KvStore, StoreError};

/// Counters describing the loader's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Loads that published a snapshot, including the first one.
    pub successful_loads: u64,
    /// Loads that failed, including a failed first load.
    pub failed_loads: u64,
    /// Failures since the last success.
    pub consecutive_failures: u64,
    /// Store revision of the current snapshot (0 before the first load).
    pub revision: i64,
}

#[derive(Debug, Default)]
struct Counters {
    successful_loads: AtomicU64,
    failed_loads: AtomicU64,
    consecutive_failures: AtomicU64,
    revision: AtomicI64,
}

/// State shared between the handle and the poller task.
pub(crate) struct Inner<T> {
    pub(crate) store: Arc<dyn KvStore>,
    pub(crate) settings: StoreConfig,
    pub(crate) reload_delay: Duration,
    current: ArcSwapOption<T>,
    initialized: AtomicBool,
    poller_started: AtomicBool,
    /// Serializes first loads so concurrent `initialize` calls fetch once.
    init_lock: Mutex<()>,
    poller: Mutex<Option<JoinHandle<()>>>,
    counters: Counters,
}

impl<T> Inner<T> {
    /// Swap in a fully decoded snapshot. Returns the previous revision.
    pub(crate) fn publish(&self, snapshot: Arc<T>, revision: i64) -> i64 {
        self.current.store(Some(snapshot));
        self.initialized.store(true, Ordering::Release);

        self.counters.successful_loads.fetch_add(1, Ordering::Relaxed);
        self.counters.consecutive_failures.store(0, Ordering::Relaxed);
        metrics::record_load_success(revision);
        self.counters.revision.swap(revision, Ordering::Relaxed)
    }

    /// Count a failed load. Returns the consecutive failure count.
    pub(crate) fn record_failure(&self, err: &LoadError) -> u64 {
        self.counters.failed_loads.fetch_add(1, Ordering::Relaxed);
        let consecutive = self.counters.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_load_failure(err.kind(), consecutive);
        consecutive
    }
}

/// Loads a JSON document of type `T` from a store and keeps it fresh.
///
/// Cloning the handle is cheap; all clones share the same snapshot and poller.
pub struct ConfigLoader<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ConfigLoader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> ConfigLoader<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create an uninitialized loader reading `settings.key` from `store`.
    pub fn new(store: Arc<dyn KvStore>, settings: StoreConfig, reload: ReloadConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                settings,
                reload_delay: reload.delay(),
                current: ArcSwapOption::empty(),
                initialized: AtomicBool::new(false),
                poller_started: AtomicBool::new(false),
                init_lock: Mutex::new(()),
                poller: Mutex::new(None),
                counters: Counters::default(),
            }),
        }
    }

    /// Create a loader backed by etcd at the configured endpoints.
    pub fn etcd(config: &LoaderConfig) -> Result<Self, StoreError> {
        let store = EtcdStore::new(&config.store.endpoints)?;
        Ok(Self::new(
            Arc::new(store),
            config.store.clone(),
            config.reload.clone(),
        ))
    }

    /// Load the document once and start the background refresh.
    ///
    /// The first successful call fetches synchronously; later calls reuse the
    /// current snapshot without contacting the store. The poller starts at
    /// most once per loader and stops when `shutdown` is triggered.
    ///
    /// On failure nothing is published and no poller is started. Deciding
    /// whether that is fatal is up to the caller.
    pub async fn initialize(&self, shutdown: &Shutdown) -> Result<Arc<T>, LoadError> {
        let snapshot = {
            let _guard = self.inner.init_lock.lock().await;

            match self.existing_snapshot() {
                Some(existing) => {
                    tracing::debug!(key = %self.inner.settings.key, "Loader already initialized, reusing snapshot");
                    existing
                }
                None => self.first_load().await?,
            }
        };

        self.start_poller(shutdown).await;
        Ok(snapshot)
    }

    fn existing_snapshot(&self) -> Option<Arc<T>> {
        if self.inner.initialized.load(Ordering::Acquire) {
            self.inner.current.load_full()
        } else {
            None
        }
    }

    async fn first_load(&self) -> Result<Arc<T>, LoadError> {
        let inner = &self.inner;

        match load_once::<T>(inner.store.as_ref(), &inner.settings).await {
            Ok(Fetched { value, revision }) => {
                let snapshot = Arc::new(value);
                inner.publish(snapshot.clone(), revision);
                tracing::info!(
                    key = %inner.settings.key,
                    revision,
                    "Configuration loaded"
                );
                Ok(snapshot)
            }
            Err(e) => {
                inner.record_failure(&e);
                tracing::error!(
                    key = %inner.settings.key,
                    error = %e,
                    kind = e.kind(),
                    "Initial configuration load failed"
                );
                Err(e)
            }
        }
    }

    async fn start_poller(&self, shutdown: &Shutdown) {
        // The handle is in place before `is_polling` reports true, so `join`
        // never misses a running poller.
        let mut slot = self.inner.poller.lock().await;
        if self.inner.poller_started.load(Ordering::Acquire) {
            tracing::debug!("Refresh poller already running");
            return;
        }

        *slot = Some(tokio::spawn(poller::run(self.inner.clone(), shutdown.subscribe())));
        self.inner.poller_started.store(true, Ordering::Release);
    }

    /// The current snapshot, or `None` before the first successful load.
    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.inner.current.load_full()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// Whether the background poller has been started.
    pub fn is_polling(&self) -> bool {
        self.inner.poller_started.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RefreshStats {
        let counters = &self.inner.counters;
        RefreshStats {
            successful_loads: counters.successful_loads.load(Ordering::Relaxed),
            failed_loads: counters.failed_loads.load(Ordering::Relaxed),
            consecutive_failures: counters.consecutive_failures.load(Ordering::Relaxed),
            revision: counters.revision.load(Ordering::Relaxed),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.settings.key
    }

    pub fn endpoints(&self) -> &[String] {
        &self.inner.settings.endpoints
    }

    /// Wait for the poller to exit after shutdown was triggered.
    ///
    /// Returns immediately if no poller was started or it was already joined.
    pub async fn join(&self) {
        let handle = self.inner.poller.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Refresh poller task failed");
            }
        }
    }
}

impl<T> std::fmt::Debug for ConfigLoader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("endpoints", &self.inner.settings.endpoints)
            .field("key", &self.inner.settings.key)
            .field("reload_delay", &self.inner.reload_delay)
            .field("initialized", &self.inner.initialized.load(Ordering::Relaxed))
            .finish()
    }
}
