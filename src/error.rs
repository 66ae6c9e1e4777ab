use crate::config::ConfigError;
use thiserror::Error;

/// Errors raised while assembling an application from its configuration.
///
/// Store and binding failures arrive wrapped as [`Error::Config`]; the other
/// variants come from the consumers of the store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("application context requires a configuration store")]
    MissingConfig,

    /// A `Logging:LogLevel` entry names a level `tracing` has no equivalent for.
    #[error("invalid log level {level:?} for '{category}'")]
    InvalidLogLevel { category: String, level: String },

    #[error("failed to install log subscriber: {0}")]
    LoggingInit(String),
}
