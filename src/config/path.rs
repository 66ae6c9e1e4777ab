//! Hierarchical key paths.
//!
//! Raw keys use `:` between segments (`wheels:brand:type`). Segments keep
//! the casing they were written with, but two paths compare equal when
//! their segments match case-insensitively.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::ConfigError;

/// The reserved separator between path segments.
pub const KEY_DELIMITER: char = ':';

/// An ordered sequence of non-empty path segments.
#[derive(Debug, Clone, Default, Eq)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// The empty path, addressing the root of the configuration.
    pub fn root() -> Self {
        Self::default()
    }

    /// Splits a raw key on [`KEY_DELIMITER`].
    ///
    /// Fails with [`ConfigError::MalformedKey`] on an empty key or any empty
    /// segment (`a::b`, `:a`, `a:`).
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::MalformedKey(raw.to_string()));
        }
        let segments: Vec<String> = raw.split(KEY_DELIMITER).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ConfigError::MalformedKey(raw.to_string()));
        }
        Ok(Self { segments })
    }

    /// Builds a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || s.contains(KEY_DELIMITER))
        {
            return Err(ConfigError::MalformedKey(segments.join(":")));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends every segment of `other` to a copy of this path.
    pub fn join(&self, other: &KeyPath) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        KeyPath { segments }
    }

    /// Appends a single segment, which must not be empty or contain the delimiter.
    pub fn child(&self, segment: &str) -> Result<KeyPath, ConfigError> {
        if segment.is_empty() || segment.contains(KEY_DELIMITER) {
            return Err(ConfigError::MalformedKey(segment.to_string()));
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(KeyPath { segments })
    }

    /// Appends an array index segment.
    pub fn index(&self, index: usize) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.push(index.to_string());
        KeyPath { segments }
    }

    /// Returns true when `prefix` is a (case-insensitive) leading part of this path.
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        prefix.len() <= self.len()
            && self
                .segments
                .iter()
                .zip(&prefix.segments)
                .all(|(a, b)| segment_eq(a, b))
    }

    /// Strips `prefix`, returning the remainder, or `None` if the prefix does not match.
    pub fn strip_prefix(&self, prefix: &KeyPath) -> Option<KeyPath> {
        self.starts_with(prefix).then(|| KeyPath {
            segments: self.segments[prefix.len()..].to_vec(),
        })
    }

    /// Lower-cased canonical key used for indexing.
    pub fn normalized(&self) -> String {
        normalize_segments(&self.segments)
    }
}

pub(crate) fn normalize_segments(segments: &[String]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(KEY_DELIMITER);
        }
        out.push_str(&segment.to_lowercase());
    }
    out
}

fn segment_eq(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl PartialEq for KeyPath {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| segment_eq(a, b))
    }
}

impl Hash for KeyPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{KEY_DELIMITER}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for KeyPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPath::parse(s)
    }
}
