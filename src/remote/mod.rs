//! Remote configuration subsystem.
//!
//! # Data Flow
//! ```text
//! initialize():
//!     fetch.rs load_once (connect → get → decode first entry)
//!     → publish Arc<T> into the snapshot slot
//!     → spawn poller.rs (once per loader)
//!
//! Every reload delay (poller.rs):
//!     load_once
//!     → Ok: atomic swap of Arc<T>, readers see the new snapshot
//!     → Err: log, keep the previous snapshot
//!
//! Shutdown triggered:
//!     poller exits, dropping any in-flight session
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; a new value is decoded off to the side and
//!   published with a single pointer swap (arc-swap)
//! - The first load reports its error to the caller instead of exiting
//! - Refresh failures never escalate; a broken store means a stale snapshot
//!   and error logs

pub mod error;
pub mod fetch;
pub mod loader;
mod poller;

pub use error::LoadError;
pub use fetch::{load_once, Fetched};
pub use loader::{ConfigLoader, RefreshStats};
