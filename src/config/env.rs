use super::path::KeyPath;
use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Environment variables as configuration.
///
/// `MYAPP__Logging__LogLevel__Default=Warning` with prefix `MYAPP` and the
/// default `__` separator becomes `Logging:LogLevel:Default = Warning`.
/// Variables with empty segments are skipped.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub const DEFAULT_SEPARATOR: &'static str = "__";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: Self::DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Uses `separator` between segments; empty separators keep the default.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.separator = separator;
        }
        self
    }

    /// Maps already-read variables to entries, skipping unrelated ones.
    fn collect<I>(&self, vars: I) -> Vec<ConfigEntry>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix_with_sep = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.prefix, self.separator)
        };
        let mut entries = Vec::new();

        for (key, value) in vars {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            match KeyPath::from_segments(path_str.split(self.separator.as_str())) {
                Ok(path) if !path.is_root() => entries.push(ConfigEntry::new(path, value)),
                _ => tracing::debug!(variable = %key, "skipping environment variable"),
            }
        }

        entries
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> String {
        format!("env:{}", self.prefix)
    }

    fn load(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(self.collect(std::env::vars()))
    }

    fn is_reloadable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefix_and_separator_mapping() {
        let source = EnvSource::new("MYAPP");
        let entries = source.collect(vars(&[
            ("MYAPP__Logging__LogLevel__Default", "Warning"),
            ("OTHER__Key", "ignored"),
        ]));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path.to_string(), "Logging:LogLevel:Default");
        assert_eq!(entries[0].value, "Warning");
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let source = EnvSource::new("MYAPP");
        let entries = source.collect(vars(&[("MYAPP__a____b", "1"), ("MYAPP__", "2")]));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_custom_separator() {
        let source = EnvSource::new("APP").with_separator("_");
        let entries = source.collect(vars(&[("APP_server_port", "8080")]));
        assert_eq!(entries[0].path.to_string(), "server:port");
    }

    #[test]
    fn test_segment_containing_delimiter_is_skipped() {
        let source = EnvSource::new("APP");
        let entries = source.collect(vars(&[("APP__a:b", "1")]));
        assert!(entries.is_empty());
    }
}
