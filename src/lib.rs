//! etcd configuration loader.
//!
//! Fetches a JSON document from etcd, decodes it into a caller-supplied type
//! and re-fetches it on a fixed interval, publishing each good snapshot with
//! an atomic swap.
//!
//! ```ignore
//! let shutdown = Shutdown::new();
//! let loader: ConfigLoader<AppConfig> = ConfigLoader::etcd(&settings)?;
//! let cfg = loader.initialize(&shutdown).await?;
//!
//! // Later, anywhere:
//! let current = loader.snapshot();
//! ```

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod remote;
pub mod store;

pub use config::LoaderConfig;
pub use lifecycle::Shutdown;
pub use remote::{ConfigLoader, LoadError, RefreshStats};
pub use store::{EtcdStore, KvStore, MemoryStore};
