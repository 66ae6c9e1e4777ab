use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::merge::Snapshot;
use super::path::KeyPath;

#[derive(Clone)]
enum View {
    Live(Arc<ArcSwap<Snapshot>>),
    Frozen(Arc<Snapshot>),
}

/// The entries of a store that share a path prefix.
///
/// Sections obtained from a store are live: every call re-reads the store's
/// current snapshot, so values follow reloads. Use [`freeze`](Self::freeze)
/// to pin a section to the snapshot current at that moment.
#[derive(Clone)]
pub struct Section {
    view: View,
    path: KeyPath,
}

impl Section {
    pub(crate) fn live(current: Arc<ArcSwap<Snapshot>>, path: KeyPath) -> Self {
        Self {
            view: View::Live(current),
            path,
        }
    }

    /// A section over nothing, used for prefixes that can never match.
    pub(crate) fn detached() -> Self {
        Self {
            view: View::Frozen(Arc::new(Snapshot::default())),
            path: KeyPath::root(),
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        match &self.view {
            View::Live(current) => current.load_full(),
            View::Frozen(snapshot) => Arc::clone(snapshot),
        }
    }

    /// Full path of this section from the root.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// The last segment of the path, or `""` for the root.
    pub fn key(&self) -> &str {
        self.path.segments().last().map_or("", String::as_str)
    }

    /// The value stored at the section's own path, if any.
    pub fn value(&self) -> Option<String> {
        if self.path.is_root() {
            return None;
        }
        self.snapshot().get(&self.path).map(str::to_string)
    }

    /// Looks up `key` relative to this section.
    pub fn get(&self, key: &str) -> Option<String> {
        let relative = KeyPath::parse(key).ok()?;
        self.snapshot()
            .get(&self.path.join(&relative))
            .map(str::to_string)
    }

    /// A nested section; `key` may span several segments (`"brand:type"`).
    pub fn get_section(&self, key: &str) -> Section {
        match KeyPath::parse(key) {
            Ok(relative) => Section {
                view: self.view.clone(),
                path: self.path.join(&relative),
            },
            Err(_) => Section::detached(),
        }
    }

    /// True when the section has a value or any entry below it.
    pub fn exists(&self) -> bool {
        let snapshot = self.snapshot();
        (!self.path.is_root() && snapshot.get(&self.path).is_some())
            || snapshot.descendants(&self.path).next().is_some()
    }

    /// Names of the immediate children, each listed once.
    ///
    /// Numeric names sort numerically and come before other names, which
    /// sort case-insensitively. A name keeps the casing of its first entry.
    pub fn children(&self) -> Vec<String> {
        let snapshot = self.snapshot();
        let depth = self.path.len();
        let mut names: BTreeMap<String, String> = BTreeMap::new();
        for entry in snapshot.descendants(&self.path) {
            if let Some(segment) = entry.path.segments().get(depth) {
                names
                    .entry(segment.to_lowercase())
                    .or_insert_with(|| segment.clone());
            }
        }
        let mut children: Vec<String> = names.into_values().collect();
        children.sort_by(|a, b| compare_segments(a, b));
        children
    }

    /// Child sections in [`children`](Self::children) order.
    pub fn child_sections(&self) -> Vec<Section> {
        self.children()
            .iter()
            .map(|name| self.get_section(name))
            .collect()
    }

    /// Every entry below this section as `(relative key, value)`.
    pub fn entries(&self) -> Vec<(String, String)> {
        let snapshot = self.snapshot();
        snapshot
            .descendants(&self.path)
            .filter_map(|entry| {
                entry
                    .path
                    .strip_prefix(&self.path)
                    .map(|relative| (relative.to_string(), entry.value.clone()))
            })
            .collect()
    }

    /// Pins this section to the store's current snapshot.
    pub fn freeze(&self) -> Section {
        Section {
            view: View::Frozen(self.snapshot()),
            path: self.path.clone(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.view, View::Frozen(_))
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("path", &self.path.to_string())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::merge;
    use crate::config::source::ConfigEntry;

    fn section(pairs: &[(&str, &str)], prefix: &str) -> Section {
        let layer: Vec<ConfigEntry> = pairs
            .iter()
            .map(|(k, v)| ConfigEntry::parse(k, *v).unwrap())
            .collect();
        let current = Arc::new(ArcSwap::from_pointee(merge([layer.as_slice()])));
        let root = Section::live(current, KeyPath::root());
        if prefix.is_empty() {
            root
        } else {
            root.get_section(prefix)
        }
    }

    #[test]
    fn test_relative_get() {
        let wheels = section(&[("wheels:count", "3")], "wheels");
        assert_eq!(wheels.get("count").as_deref(), Some("3"));
        assert_eq!(wheels.get("COUNT").as_deref(), Some("3"));
        assert_eq!(wheels.key(), "wheels");
    }

    #[test]
    fn test_missing_section_is_empty() {
        let missing = section(&[("wheels:count", "3")], "missing");
        assert!(!missing.exists());
        assert!(missing.children().is_empty());
        assert!(missing.entries().is_empty());
        assert_eq!(missing.get("count"), None);
    }

    #[test]
    fn test_children_are_distinct_and_ordered() {
        let root = section(
            &[
                ("cars:Zeta:wheels", "4"),
                ("cars:alpha:wheels", "3"),
                ("cars:alpha:brand", "x"),
                ("cars:10", "ten"),
                ("cars:2", "two"),
            ],
            "cars",
        );
        assert_eq!(root.children(), vec!["2", "10", "alpha", "Zeta"]);
    }

    #[test]
    fn test_section_value_and_nested_section() {
        let root = section(&[("a", "top"), ("a:b:c", "deep")], "");
        let a = root.get_section("a");
        assert_eq!(a.value().as_deref(), Some("top"));
        assert_eq!(a.get_section("b").get("c").as_deref(), Some("deep"));
        assert_eq!(root.get_section("a:b").get("c").as_deref(), Some("deep"));
        assert_eq!(root.value(), None);
    }

    #[test]
    fn test_entries_are_relative() {
        let logging = section(
            &[("Logging:LogLevel:Default", "Information"), ("Other", "x")],
            "Logging",
        );
        assert_eq!(
            logging.entries(),
            vec![("LogLevel:Default".to_string(), "Information".to_string())]
        );
    }

    #[test]
    fn test_live_section_follows_swaps_but_frozen_does_not() {
        let first: Vec<ConfigEntry> = vec![ConfigEntry::parse("k:v", "1").unwrap()];
        let second: Vec<ConfigEntry> = vec![ConfigEntry::parse("k:v", "2").unwrap()];
        let current = Arc::new(ArcSwap::from_pointee(merge([first.as_slice()])));
        let live = Section::live(Arc::clone(&current), KeyPath::parse("k").unwrap());
        let frozen = live.freeze();

        current.store(Arc::new(merge([second.as_slice()])));

        assert_eq!(live.get("v").as_deref(), Some("2"));
        assert_eq!(frozen.get("v").as_deref(), Some("1"));
    }
}
