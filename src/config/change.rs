//! Change notification between snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::merge::Snapshot;
use super::path::KeyPath;

/// One key that differs between the previous and the new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChangeEvent {
    Created { key: KeyPath, value: String },
    Updated { key: KeyPath, value: String },
    Deleted { key: KeyPath },
}

impl ChangeEvent {
    pub fn key(&self) -> &KeyPath {
        match self {
            ChangeEvent::Created { key, .. }
            | ChangeEvent::Updated { key, .. }
            | ChangeEvent::Deleted { key } => key,
        }
    }
}

/// Every change produced by one snapshot swap.
///
/// Creations and updates come first in canonical key order, then deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    /// Version of the snapshot that is now current.
    pub version: u64,
    pub events: Vec<ChangeEvent>,
}

/// Computes the events that turn `old` into `new`.
///
/// A key whose only difference is casing is not reported.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    for (key, entry) in new.raw() {
        match old.raw().get(key) {
            None => events.push(ChangeEvent::Created {
                key: entry.path.clone(),
                value: entry.value.clone(),
            }),
            Some(previous) if previous.value != entry.value => events.push(ChangeEvent::Updated {
                key: entry.path.clone(),
                value: entry.value.clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, entry) in old.raw() {
        if !new.raw().contains_key(key) {
            events.push(ChangeEvent::Deleted {
                key: entry.path.clone(),
            });
        }
    }
    events
}

type Listener = Arc<dyn Fn(&ChangeNotification) + Send + Sync>;

/// Registered change listeners, called in registration order.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

impl Listeners {
    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, listener));
        Subscription {
            id,
            listeners: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.entries.lock().retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn broadcast(&self, notification: &ChangeNotification) {
        // Listeners may subscribe or unsubscribe from inside the callback.
        let listeners: Vec<Listener> = self
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(notification);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Keeps a change listener registered until dropped or cancelled.
#[must_use = "the listener is removed when the subscription is dropped"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
