//! Ordered replay of source layers into one flat snapshot.

use std::collections::BTreeMap;

use super::path::{KeyPath, KEY_DELIMITER};
use super::source::ConfigEntry;

/// An immutable merged view of every source at one point in time.
///
/// Keys are the lower-cased canonical form of each path, so lookups ignore
/// case while entries keep the casing of the source that wrote them last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    version: u64,
    entries: BTreeMap<String, ConfigEntry>,
}

impl Snapshot {
    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Incremented every time the store swaps in a new snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &KeyPath) -> Option<&str> {
        self.entries
            .get(&path.normalized())
            .map(|entry| entry.value.as_str())
    }

    /// All entries in canonical key order.
    pub fn entries(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.values()
    }

    /// Entries strictly below `prefix`, in canonical key order.
    pub fn descendants<'a>(&'a self, prefix: &KeyPath) -> impl Iterator<Item = &'a ConfigEntry> + 'a {
        let start = if prefix.is_root() {
            String::new()
        } else {
            format!("{}{KEY_DELIMITER}", prefix.normalized())
        };
        let bounded = start.clone();
        self.entries
            .range(start..)
            .take_while(move |(key, _)| key.starts_with(&bounded))
            .map(|(_, entry)| entry)
    }

    /// True when the two snapshots hold the same keys and values.
    pub fn same_contents(&self, other: &Snapshot) -> bool {
        self.entries == other.entries
    }

    /// True when both snapshots also spell every key the same way.
    pub(crate) fn same_spelling(&self, other: &Snapshot) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .values()
                .zip(other.entries.values())
                .all(|(a, b)| a.value == b.value && a.path.segments() == b.path.segments())
    }

    pub(crate) fn raw(&self) -> &BTreeMap<String, ConfigEntry> {
        &self.entries
    }
}

/// Merges layers in order; for each path the last writer wins.
pub fn merge<'a, I>(layers: I) -> Snapshot
where
    I: IntoIterator<Item = &'a [ConfigEntry]>,
{
    let mut entries = BTreeMap::new();
    for layer in layers {
        for entry in layer {
            entries.insert(entry.path.normalized(), entry.clone());
        }
    }
    Snapshot {
        version: 0,
        entries,
    }
}
