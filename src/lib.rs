//! Layered, hierarchical configuration.
//!
//! Sources (JSON/TOML files, in-memory pairs, environment variables, fetched
//! documents or custom providers) are merged in registration order into one
//! flat namespace of `:`-separated keys. The merged view can be queried by
//! key or section, reloaded atomically and bound onto typed options.

pub mod config;
pub mod context;
mod error;
pub mod logging;

pub use config::{ConfigBuilder, ConfigError, ConfigurationStore, Section};
pub use context::AppContext;
pub use error::Error;
