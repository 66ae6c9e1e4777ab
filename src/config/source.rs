use std::fmt;

use super::path::KeyPath;
use super::ConfigError;

/// A single flattened key/value pair contributed by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub path: KeyPath,
    pub value: String,
}

impl ConfigEntry {
    pub fn new(path: KeyPath, value: impl Into<String>) -> Self {
        Self {
            path,
            value: value.into(),
        }
    }

    /// Parses `key` with the `:` convention.
    pub fn parse(key: &str, value: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self::new(KeyPath::parse(key)?, value))
    }
}

/// One origin of configuration entries.
///
/// `load` must not mutate global state. Sources that can produce different
/// entries over time report `is_reloadable() == true`; the store only calls
/// `load` again on those during a reload.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Name used in errors and logs, e.g. `json:appsettings.json`.
    fn name(&self) -> String;

    fn load(&self) -> Result<Vec<ConfigEntry>, ConfigError>;

    fn is_reloadable(&self) -> bool {
        false
    }
}

/// Document formats understood by file and fetched sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// Picks a format from a file name: `.toml` is TOML, everything else JSON.
    pub fn from_path(path: &str) -> Self {
        if path.rsplit('.').next().is_some_and(|ext| ext.eq_ignore_ascii_case("toml")) {
            Format::Toml
        } else {
            Format::Json
        }
    }

    /// Parses a document and flattens it into entries.
    pub fn parse(self, source_name: &str, bytes: &[u8]) -> Result<Vec<ConfigEntry>, ConfigError> {
        match self {
            Format::Json => {
                let value: serde_json::Value = serde_json::from_slice(bytes)
                    .map_err(|e| ConfigError::malformed(source_name, e))?;
                flatten_json(source_name, &value)
            }
            Format::Toml => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| ConfigError::malformed(source_name, e))?;
                let table: toml::Table =
                    toml::from_str(text).map_err(|e| ConfigError::malformed(source_name, e))?;
                flatten_toml(source_name, &toml::Value::Table(table))
            }
        }
    }
}

/// Flattens a JSON document into `(path, string)` entries.
///
/// The top level must be an object. Array elements use their index as the
/// path segment; `null` becomes an empty string.
pub fn flatten_json(
    source_name: &str,
    value: &serde_json::Value,
) -> Result<Vec<ConfigEntry>, ConfigError> {
    if !value.is_object() {
        return Err(ConfigError::malformed(
            source_name,
            "top-level JSON value must be an object",
        ));
    }
    let mut entries = Vec::new();
    visit_json(source_name, &KeyPath::root(), value, &mut entries)?;
    Ok(entries)
}

fn visit_json(
    source_name: &str,
    prefix: &KeyPath,
    value: &serde_json::Value,
    out: &mut Vec<ConfigEntry>,
) -> Result<(), ConfigError> {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let path = prefix.join(&key_path(source_name, key)?);
                visit_json(source_name, &path, nested, out)?;
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                let path = prefix.index(index);
                visit_json(source_name, &path, nested, out)?;
            }
        }
        Value::String(s) => out.push(ConfigEntry::new(prefix.clone(), s.clone())),
        Value::Number(n) => out.push(ConfigEntry::new(prefix.clone(), n.to_string())),
        Value::Bool(b) => out.push(ConfigEntry::new(prefix.clone(), b.to_string())),
        Value::Null => out.push(ConfigEntry::new(prefix.clone(), String::new())),
    }
    Ok(())
}

/// Flattens a TOML value the same way as [`flatten_json`].
pub fn flatten_toml(source_name: &str, value: &toml::Value) -> Result<Vec<ConfigEntry>, ConfigError> {
    let mut entries = Vec::new();
    visit_toml(source_name, &KeyPath::root(), value, &mut entries)?;
    Ok(entries)
}

fn visit_toml(
    source_name: &str,
    prefix: &KeyPath,
    value: &toml::Value,
    out: &mut Vec<ConfigEntry>,
) -> Result<(), ConfigError> {
    use toml::Value;

    let scalar = match value {
        Value::Table(table) => {
            for (key, nested) in table {
                let path = prefix.join(&key_path(source_name, key)?);
                visit_toml(source_name, &path, nested, out)?;
            }
            return Ok(());
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                visit_toml(source_name, &prefix.index(index), nested, out)?;
            }
            return Ok(());
        }
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(dt) => dt.to_string(),
    };
    out.push(ConfigEntry::new(prefix.clone(), scalar));
    Ok(())
}

fn key_path(source_name: &str, key: &str) -> Result<KeyPath, ConfigError> {
    KeyPath::parse(key).map_err(|e| ConfigError::malformed(source_name, e))
}
