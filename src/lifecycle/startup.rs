//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the etcd-backed loader from validated settings
//! - Perform the first load and start the refresh poller
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned, the binary turns it into exit(1)
//! - Logging and metrics are set up by the caller before this runs

use serde::de::DeserializeOwned;

use crate::config::LoaderConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::remote::{ConfigLoader, LoadError};
use crate::store::StoreError;

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid store settings: {0}")]
    Store(#[from] StoreError),

    #[error("Initial configuration load failed: {0}")]
    Load(#[from] LoadError),
}

/// Build a loader for `config` and load the document once.
pub async fn start<T>(config: &LoaderConfig, shutdown: &Shutdown) -> Result<ConfigLoader<T>, StartupError>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    tracing::info!(
        endpoints = ?config.store.endpoints,
        key = %config.store.key,
        reload_delay_ms = config.reload.delay_ms,
        "Starting configuration loader"
    );

    let loader = ConfigLoader::etcd(config)?;
    loader.initialize(shutdown).await?;
    Ok(loader)
}
