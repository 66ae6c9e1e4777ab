use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::env::EnvSource;
use super::fetch::{Fetch, FetchSource};
use super::file::FileSource;
use super::memory::MemorySource;
use super::source::{ConfigSource, Format};
use super::store::ConfigurationStore;
use super::ConfigError;

/// Builder for a [`ConfigurationStore`] layered from several sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones key by key. Nested documents are flattened into `:`-joined
/// paths before merging, so a later source only replaces the leaves it sets.
///
/// ## Example
///
/// ```no_run
/// use strata::config::{ConfigBuilder, OptionsShape};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Wheels {
///     count: i64,
///     brand: String,
/// }
///
/// let store = ConfigBuilder::new()
///     .with_json_file("wwwroot/appsettings.json", true)
///     .with_json_file("wwwroot/appsettings.Development.json", false)
///     .with_memory([("wheels:brand", "Blazin")])
///     .build()?;
///
/// let wheels: Wheels = store
///     .get_section("wheels")
///     .bind_as(&OptionsShape::new().integer("count").string("brand"))?;
/// # Ok::<(), strata::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigBuilder {
    sources: Vec<Arc<dyn ConfigSource>>,
}

impl ConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a JSON or TOML file, picking the format from the extension.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing contribute nothing.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    pub fn with_json_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required).with_format(Format::Json))
    }

    pub fn with_toml_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required).with_format(Format::Toml))
    }

    /// Adds in-memory `key -> value` pairs with `:`-joined keys.
    pub fn with_memory<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.with_source(MemorySource::new(pairs))
    }

    /// Loads configuration from environment variables with the given prefix.
    ///
    /// Environment variables are mapped to config paths by:
    /// 1. Removing the prefix and the `__` separator
    /// 2. Splitting remaining segments on `__`
    ///
    /// ```no_run
    /// # use strata::config::ConfigBuilder;
    /// // defaults -> env overrides -> local file overrides env
    /// let store = ConfigBuilder::new()
    ///     .with_json_file("appsettings.json", true)
    ///     .with_env("MYAPP")
    ///     .with_json_file("appsettings.local.json", false)
    ///     .build()?;
    /// # Ok::<(), strata::ConfigError>(())
    /// ```
    pub fn with_env(self, prefix: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix))
    }

    /// Adds a document supplied by a fetch collaborator, bounded by `timeout`.
    pub fn with_fetch(
        self,
        path: impl Into<String>,
        fetcher: Arc<dyn Fetch>,
        timeout: Duration,
    ) -> Self {
        self.with_source(FetchSource::new(path, fetcher).with_timeout(timeout))
    }

    /// Adds any source, including custom providers.
    pub fn with_source(self, source: impl ConfigSource + 'static) -> Self {
        self.with_shared_source(Arc::new(source))
    }

    /// Adds a source that the caller keeps a handle to.
    pub fn with_shared_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Registers the sources without loading them.
    pub fn build_unloaded(self) -> ConfigurationStore {
        ConfigurationStore::new(self.sources)
    }

    /// Builds the store and performs the initial load.
    ///
    /// Any source failure here is fatal; no fallback configuration is produced.
    pub fn build(self) -> Result<ConfigurationStore, ConfigError> {
        let store = self.build_unloaded();
        store.load()?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_file_then_memory_override() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"wheels": {{"count": "3", "brand": "Stock"}}}}"#).unwrap();

        let store = ConfigBuilder::new()
            .with_json_file(file.path(), true)
            .with_memory([("wheels:brand", "Blazin")])
            .build()
            .unwrap();

        assert_eq!(store.get("wheels:count").as_deref(), Some("3"));
        assert_eq!(store.get("wheels:brand").as_deref(), Some("Blazin"));
    }

    #[test]
    fn test_optional_missing_file_is_skipped() {
        let store = ConfigBuilder::new()
            .with_json_file("/nonexistent/appsettings.Development.json", false)
            .with_memory([("a", "1")])
            .build()
            .unwrap();
        assert_eq!(store.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_required_missing_file_fails_build() {
        let result = ConfigBuilder::new()
            .with_json_file("/nonexistent/appsettings.json", true)
            .build();
        assert!(matches!(result, Err(ConfigError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_sources_listed_in_registration_order() {
        let store = ConfigBuilder::new()
            .with_memory([("a", "1")])
            .with_env("STRATA_TEST_UNUSED")
            .build_unloaded();
        assert_eq!(store.sources(), vec!["memory", "env:STRATA_TEST_UNUSED"]);
    }
}
