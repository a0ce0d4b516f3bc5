//! Background refresh loop.
//!
//! # Responsibilities
//! - Sleep for the reload delay, then re-fetch the document
//! - Publish each successful load as a new snapshot
//! - Log failures and keep the previous snapshot

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::time;

use crate::lifecycle::ShutdownListener;
use crate::remote::fetch::load_once;
use crate::remote::loader::Inner;

pub(crate) async fn run<T>(inner: Arc<Inner<T>>, mut shutdown: ShutdownListener)
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    tracing::info!(
        key = %inner.settings.key,
        delay_ms = inner.reload_delay.as_millis() as u64,
        "Refresh poller starting"
    );

    loop {
        tokio::select! {
            _ = time::sleep(inner.reload_delay) => {}
            _ = shutdown.recv() => {
                tracing::info!("Refresh poller received shutdown signal, exiting loop");
                break;
            }
        }

        // Dropping an in-flight load also drops its session.
        let outcome = tokio::select! {
            outcome = load_once::<T>(inner.store.as_ref(), &inner.settings) => outcome,
            _ = shutdown.recv() => {
                tracing::info!("Refresh poller received shutdown signal during fetch, exiting loop");
                break;
            }
        };

        match outcome {
            Ok(fetched) => {
                let revision = fetched.revision;
                let previous = inner.publish(Arc::new(fetched.value), revision);
                if previous != revision {
                    tracing::info!(key = %inner.settings.key, previous, revision, "Configuration updated");
                } else {
                    tracing::debug!(key = %inner.settings.key, revision, "Configuration unchanged");
                }
            }
            Err(e) => {
                let consecutive_failures = inner.record_failure(&e);
                tracing::error!(
                    key = %inner.settings.key,
                    error = %e,
                    kind = e.kind(),
                    consecutive_failures,
                    "Failed to refresh configuration. Keeping current configuration."
                );
            }
        }
    }
}
