//! Application context handing configuration to the rest of the application.

use crate::config::{BoundOptions, ConfigurationStore, Options, Section};
use crate::logging;
use crate::Error;

/// Central application context holding the configuration store.
///
/// Collaborators receive either a [`Section`] (for example logging reads
/// `Logging`) or typed options bound from one (for example an authentication
/// layer binding `Local`).
///
/// ## Example
///
/// ```no_run
/// use strata::config::ConfigBuilder;
/// use strata::AppContext;
///
/// let ctx = AppContext::builder()
///     .with_config(
///         ConfigBuilder::new()
///             .with_json_file("wwwroot/appsettings.json", true)
///             .build()?,
///     )
///     .with_logging(true)
///     .build()?;
///
/// let brand = ctx.config().get("wheels:brand");
/// # Ok::<(), strata::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ConfigurationStore,
}

impl AppContext {
    /// Creates a new builder for constructing an `AppContext`.
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    pub fn config(&self) -> &ConfigurationStore {
        &self.config
    }

    /// A live view of `name`.
    pub fn section(&self, name: &str) -> Section {
        self.config.get_section(name)
    }

    /// Binds `T` from its own section; the result does not follow reloads.
    pub fn options<T: Options>(&self) -> Result<BoundOptions<T>, Error> {
        Ok(self.config.options::<T>()?)
    }
}

/// Builder for constructing an [`AppContext`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct AppContextBuilder {
    config: Option<ConfigurationStore>,
    init_logging: bool,
}

impl AppContextBuilder {
    /// Attaches a loaded configuration store.
    pub fn with_config(mut self, config: ConfigurationStore) -> Self {
        self.config = Some(config);
        self
    }

    /// Installs the global log subscriber from the `Logging` section on build.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Builds the `AppContext`.
    ///
    /// Returns an error if no configuration was provided or logging setup fails.
    pub fn build(self) -> Result<AppContext, Error> {
        let config = self.config.ok_or(Error::MissingConfig)?;
        if self.init_logging {
            logging::init(&config.get_section(logging::LOGGING_SECTION))?;
        }
        Ok(AppContext { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, OptionsShape};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Local {
        authority: String,
    }

    impl Options for Local {
        const SECTION: &'static str = "Local";

        fn shape() -> OptionsShape {
            OptionsShape::new().string("Authority")
        }
    }

    #[test]
    fn test_build_requires_config() {
        let result = AppContext::builder().build();
        assert!(matches!(result, Err(Error::MissingConfig)));
    }

    #[test]
    fn test_options_and_sections() {
        let store = ConfigBuilder::new()
            .with_memory([("Local:Authority", "https://login.example"), ("wheels:count", "3")])
            .build()
            .unwrap();
        let ctx = AppContext::builder().with_config(store).build().unwrap();

        assert_eq!(ctx.options::<Local>().unwrap().authority, "https://login.example");
        assert_eq!(ctx.section("wheels").get("count").as_deref(), Some("3"));
    }

    #[test]
    fn test_invalid_logging_section_fails_build() {
        let store = ConfigBuilder::new()
            .with_memory([("Logging:LogLevel:Default", "Loud")])
            .build()
            .unwrap();
        let result = AppContext::builder()
            .with_config(store)
            .with_logging(true)
            .build();
        assert!(matches!(result, Err(Error::InvalidLogLevel { .. })));
    }
}
