//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Loader and poller produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (load counters, revision gauge)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
