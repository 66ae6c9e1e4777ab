//! The queryable configuration store.
//!
//! Readers load the current [`Snapshot`] through an `ArcSwap` and never take
//! a lock. Writers (`load`, `reload`, `add_source`) serialize on a mutex,
//! build the next snapshot off to the side and swap it in whole. Change
//! listeners run in version order.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, ReentrantMutex};
use rayon::prelude::*;

use super::change::{diff, ChangeNotification, Listeners, Subscription};
use super::error::SourceFailure;
use super::merge::{merge, Snapshot};
use super::path::KeyPath;
use super::section::Section;
use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Lifecycle of a [`ConfigurationStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Sources are registered but nothing has been loaded yet.
    Uninitialized,
    Loaded,
    Reloading,
    /// The last reload failed; the previous snapshot is still served.
    ///
    /// Only a successful reload leaves this state; `add_source` keeps it.
    LoadError,
}

/// Cooperative cancellation for [`ConfigurationStore::reload_with`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A registered source and the entries it produced on its last successful load.
struct Layer {
    source: Arc<dyn ConfigSource>,
    entries: Vec<ConfigEntry>,
}

struct Writer {
    layers: Vec<Layer>,
}

struct Inner {
    current: Arc<ArcSwap<Snapshot>>,
    writer: Mutex<Writer>,
    state: Mutex<StoreState>,
    listeners: Arc<Listeners>,
    /// Held across a whole write and its broadcast, taken before `writer`.
    /// Reentrant so a listener can write to the store.
    serial: ReentrantMutex<()>,
}

/// Merged, hierarchical configuration built from an ordered list of sources.
///
/// Cloning is cheap; clones share the same snapshot and sources.
#[derive(Clone)]
pub struct ConfigurationStore {
    inner: Arc<Inner>,
}

impl ConfigurationStore {
    /// Registers `sources` in order without loading them.
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ConfigSource>>,
    {
        let layers = sources
            .into_iter()
            .map(|source| Layer {
                source,
                entries: Vec::new(),
            })
            .collect();
        Self {
            inner: Arc::new(Inner {
                current: Arc::new(ArcSwap::from_pointee(Snapshot::default())),
                writer: Mutex::new(Writer { layers }),
                state: Mutex::new(StoreState::Uninitialized),
                listeners: Arc::new(Listeners::default()),
                serial: ReentrantMutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> StoreState {
        *self.inner.state.lock()
    }

    /// The snapshot currently served to readers.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.current.load_full()
    }

    /// Names of the registered sources, in merge order.
    pub fn sources(&self) -> Vec<String> {
        self.inner
            .writer
            .lock()
            .layers
            .iter()
            .map(|layer| layer.source.name())
            .collect()
    }

    /// Exact-path lookup. `None` means unset; malformed keys are never set.
    pub fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).ok().flatten()
    }

    /// Like [`get`](Self::get), but reports malformed keys.
    pub fn try_get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let path = KeyPath::parse(key)?;
        Ok(self.get_path(&path))
    }

    pub fn get_path(&self, path: &KeyPath) -> Option<String> {
        self.inner.current.load().get(path).map(str::to_string)
    }

    /// A live view of every entry below `prefix`.
    ///
    /// An empty prefix addresses the root. A prefix with no entries (or a
    /// malformed one) yields an empty section rather than an error.
    pub fn get_section(&self, prefix: &str) -> Section {
        if prefix.is_empty() {
            return self.root();
        }
        match KeyPath::parse(prefix) {
            Ok(path) => Section::live(Arc::clone(&self.inner.current), path),
            Err(_) => Section::detached(),
        }
    }

    pub fn root(&self) -> Section {
        Section::live(Arc::clone(&self.inner.current), KeyPath::root())
    }

    /// Calls `listener` after every snapshot swap that changed at least one key.
    ///
    /// Notifications arrive in version order; writers on other threads wait
    /// until every listener has returned. A listener may itself write to the
    /// store, in which case the nested notification is delivered at once.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(listener))
    }

    /// Loads every registered source and publishes the first snapshot.
    ///
    /// Any source failure is returned as-is and nothing is published.
    pub fn load(&self) -> Result<(), ConfigError> {
        let _serial = self.inner.serial.lock();
        let mut writer = self.inner.writer.lock();
        let all: Vec<usize> = (0..writer.layers.len()).collect();

        let mut loaded = Vec::with_capacity(all.len());
        for (index, result) in load_layers(&writer.layers, &all) {
            loaded.push((index, result?));
        }
        for (index, entries) in loaded {
            writer.layers[index].entries = entries;
        }

        let notification = self.publish(&writer);
        *self.inner.state.lock() = StoreState::Loaded;
        drop(writer);
        self.notify(notification);
        Ok(())
    }

    /// Re-loads the reloadable sources and re-merges.
    ///
    /// On failure the previous snapshot stays current and the store moves to
    /// [`StoreState::LoadError`]. A store that was never loaded is loaded instead.
    pub fn reload(&self) -> Result<(), ConfigError> {
        self.reload_with(&CancelToken::new())
    }

    /// [`reload`](Self::reload) that gives up without publishing if `cancel`
    /// is triggered before the new snapshot is swapped in.
    pub fn reload_with(&self, cancel: &CancelToken) -> Result<(), ConfigError> {
        let _serial = self.inner.serial.lock();
        if self.state() == StoreState::Uninitialized {
            return self.load();
        }

        let mut writer = self.inner.writer.lock();
        let previous = std::mem::replace(&mut *self.inner.state.lock(), StoreState::Reloading);

        let reloadable: Vec<usize> = writer
            .layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.source.is_reloadable())
            .map(|(index, _)| index)
            .collect();
        tracing::debug!(sources = reloadable.len(), "reloading configuration");

        let mut loaded = Vec::with_capacity(reloadable.len());
        let mut failures = Vec::new();
        for (index, result) in load_layers(&writer.layers, &reloadable) {
            match result {
                Ok(entries) => loaded.push((index, entries)),
                Err(error) => {
                    let source_name = writer.layers[index].source.name();
                    tracing::warn!(source = %source_name, %error, "configuration source failed to reload");
                    failures.push(SourceFailure { source_name, error });
                }
            }
        }

        if !failures.is_empty() {
            *self.inner.state.lock() = StoreState::LoadError;
            return Err(ConfigError::ReloadFailed { failures });
        }
        if cancel.is_cancelled() {
            *self.inner.state.lock() = previous;
            tracing::debug!("configuration reload cancelled");
            return Err(ConfigError::ReloadCancelled);
        }

        for (index, entries) in loaded {
            writer.layers[index].entries = entries;
        }
        let notification = self.publish(&writer);
        *self.inner.state.lock() = StoreState::Loaded;
        drop(writer);
        self.notify(notification);
        Ok(())
    }

    /// Inserts `source` at `position` in the merge order (past the end
    /// appends), loads it and re-merges.
    ///
    /// A source that fails to load is not registered. Before the first
    /// [`load`](Self::load) the source is only registered. The store state is
    /// left as it was: a store in [`StoreState::LoadError`] stays there until
    /// a reload succeeds, since the sources that failed were not retried.
    pub fn add_source(
        &self,
        source: Arc<dyn ConfigSource>,
        position: usize,
    ) -> Result<(), ConfigError> {
        let _serial = self.inner.serial.lock();
        let mut writer = self.inner.writer.lock();
        let position = position.min(writer.layers.len());

        if self.state() == StoreState::Uninitialized {
            writer.layers.insert(
                position,
                Layer {
                    source,
                    entries: Vec::new(),
                },
            );
            return Ok(());
        }

        let entries = source.load()?;
        tracing::debug!(source = %source.name(), entries = entries.len(), position, "added configuration source");
        writer.layers.insert(position, Layer { source, entries });

        let notification = self.publish(&writer);
        drop(writer);
        self.notify(notification);
        Ok(())
    }

    /// Appends `source` as the highest-precedence layer.
    pub fn push_source(&self, source: Arc<dyn ConfigSource>) -> Result<(), ConfigError> {
        self.add_source(source, usize::MAX)
    }

    /// Merges the writer's layers and swaps the result in if anything changed.
    ///
    /// A merge that only respells keys is swapped in under the same version
    /// without a notification. Must be called with the writer lock held.
    fn publish(&self, writer: &Writer) -> Option<ChangeNotification> {
        let merged = merge(writer.layers.iter().map(|layer| layer.entries.as_slice()));
        let current = self.inner.current.load_full();
        let events = diff(&current, &merged);
        if events.is_empty() {
            if !current.same_spelling(&merged) {
                self.inner
                    .current
                    .store(Arc::new(merged.with_version(current.version())));
            }
            tracing::debug!(version = current.version(), "configuration unchanged");
            return None;
        }

        let version = current.version() + 1;
        let next = merged.with_version(version);
        tracing::info!(version, entries = next.len(), changes = events.len(), "configuration snapshot published");
        self.inner.current.store(Arc::new(next));
        Some(ChangeNotification { version, events })
    }

    /// Must be called with the serial lock held.
    fn notify(&self, notification: Option<ChangeNotification>) {
        if let Some(notification) = notification {
            self.inner.listeners.broadcast(&notification);
        }
    }
}

/// Loads the given layers concurrently and returns once all have finished.
fn load_layers(
    layers: &[Layer],
    indices: &[usize],
) -> Vec<(usize, Result<Vec<ConfigEntry>, ConfigError>)> {
    indices
        .par_iter()
        .map(|&index| {
            let source = &layers[index].source;
            let result = source.load();
            if let Ok(entries) = &result {
                tracing::debug!(source = %source.name(), entries = entries.len(), "loaded configuration source");
            }
            (index, result)
        })
        .collect()
}

impl fmt::Debug for ConfigurationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationStore")
            .field("state", &self.state())
            .field("version", &self.snapshot().version())
            .field("sources", &self.sources())
            .finish()
    }
}
