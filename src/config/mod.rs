//! Loader settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LoaderConfig (validated, immutable)
//!     → handed to ConfigLoader / startup
//! ```
//!
//! These are the loader's own settings. The application document it fetches
//! lives in the store and is typed by the caller.
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal settings files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{split_endpoints, LoaderConfig, ObservabilityConfig, ReloadConfig, StoreConfig};
pub use validation::{validate_config, ValidationError};
