//! File-based configuration source.

use std::path::{Path, PathBuf};

use super::source::{ConfigEntry, ConfigSource, Format};
use super::ConfigError;

/// A configuration source that loads a JSON or TOML document from disk.
///
/// Files can be marked as required or optional. Required files that don't exist
/// cause an error; optional files that don't exist contribute no entries.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: Format,
    required: bool,
    reload_on_change: bool,
}

impl FileSource {
    /// Creates a new file source, picking the format from the extension.
    ///
    /// If `required` is true, loading fails if the file doesn't exist.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Format::from_path(&path.to_string_lossy());
        Self {
            path,
            format,
            required,
            reload_on_change: false,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Re-read the file on every store reload.
    pub fn reload_on_change(mut self, reload: bool) -> Self {
        self.reload_on_change = reload;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn load(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        match std::fs::read(&self.path) {
            Ok(contents) => self.format.parse(&self.name(), &contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.required {
                    Err(ConfigError::unavailable(
                        self.name(),
                        "required config file not found",
                    ))
                } else {
                    tracing::debug!(path = %self.path.display(), "optional config file missing");
                    Ok(Vec::new())
                }
            }
            Err(e) => Err(ConfigError::unavailable(self.name(), e)),
        }
    }

    fn is_reloadable(&self) -> bool {
        self.reload_on_change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_file_source_loads_valid_json() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"wheels": {{"count": 3}}}}"#).unwrap();

        let source = FileSource::new(file.path(), true);
        let entries = source.load().unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path.to_string(), "wheels:count");
        assert_eq!(entries[0].value, "3");
    }

    #[test]
    fn test_file_source_loads_toml_by_extension() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[wheels]\nbrand = \"Blazin\"").unwrap();

        let entries = FileSource::new(file.path(), true).load().unwrap();

        assert_eq!(entries[0].path.to_string(), "wheels:brand");
        assert_eq!(entries[0].value, "Blazin");
    }

    #[test]
    fn test_file_source_required_missing() {
        let source = FileSource::new("/nonexistent/path/appsettings.json", true);
        let result = source.load();

        assert!(matches!(result, Err(ConfigError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_file_source_optional_missing() {
        let source = FileSource::new("/nonexistent/path/appsettings.json", false);
        let entries = source.load().unwrap();

        assert!(entries.is_empty());
    }

    #[test]
    fn test_file_source_malformed() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{ \"unterminated\": ").unwrap();

        let result = FileSource::new(file.path(), true).load();

        assert!(matches!(result, Err(ConfigError::SourceMalformed { .. })));
    }
}
