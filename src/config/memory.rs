//! In-memory configuration source.

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Ordered `key -> value` pairs held in memory.
///
/// Keys are already delimiter-joined (`"wheels:count"`). Later pairs win over
/// earlier pairs with the same key once merged.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    pairs: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: "memory".to_string(),
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Overrides the name reported in logs and errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new(Vec::<(String, String)>::new())
    }
}

impl ConfigSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        self.pairs
            .iter()
            .map(|(key, value)| ConfigEntry::parse(key, value.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_preserves_order() {
        let source = MemorySource::new([("wheels:count", "3"), ("wheels:brand", "Blazin")]);
        let entries = source.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path.to_string(), "wheels:count");
        assert_eq!(entries[1].value, "Blazin");
    }

    #[test]
    fn test_memory_source_rejects_malformed_key() {
        let source = MemorySource::new([("wheels::count", "3")]);
        assert!(matches!(source.load(), Err(ConfigError::MalformedKey(_))));
    }

    #[test]
    fn test_memory_source_is_not_reloadable() {
        assert!(!MemorySource::default().is_reloadable());
    }
}
