//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → etcd store → first load → start poller
//!
//! Shutdown (shutdown.rs):
//!     Trigger → poller leaves its loop → caller joins it
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - The caller owns the Shutdown coordinator, so pollers stop deterministically
//! - A failed first load is an error value here; exiting is the binary's call

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownListener};
pub use startup::{start, StartupError};
