//! Key-value observation bridge and reactive settings access.
//!
//! A settings store does not emit events on its own. Instead it reports
//! every change through [`KeyedSignals::notify_changed`], which fans the
//! change out to the signal of that key, if anyone ever asked for one.
//! Per-key signals are created lazily and all of them complete when the
//! bridge is closed or dropped.

use crate::error::SettingsError;
use crate::{NoError, Observer, Signal, SignalProducer};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A change of one key: the key and its new value (`None` once removed).
pub type Change<V> = (String, Option<V>);

/// Lazily created per-key signals, fed by explicit change notifications.
pub struct KeyedSignals<V> {
    entries: Mutex<HashMap<String, (Signal<Change<V>, NoError>, Observer<Change<V>, NoError>)>>,
}

impl<V> KeyedSignals<V>
where
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The signal of changes to `key`, created on first use.
    pub fn signal_for(&self, key: &str) -> Signal<Change<V>, NoError> {
        let mut entries = self.entries.lock();
        let (signal, _) = entries.entry(key.to_owned()).or_insert_with(|| {
            tracing::trace!(key, "observing key");
            Signal::pipe()
        });
        signal.clone()
    }

    /// Report that `key` changed to `value`.
    ///
    /// Nothing is sent for keys nobody observes.
    pub fn notify_changed(&self, key: &str, value: Option<V>) {
        let observer = self.entries.lock().get(key).map(|(_, observer)| observer.clone());
        match observer {
            Some(observer) => observer.send_next((key.to_owned(), value)),
            None => tracing::trace!(key, "change of unobserved key"),
        }
    }

    /// Keys that currently have a signal.
    pub fn observed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Complete every per-key signal and forget them.
    pub fn close(&self) {
        let entries: Vec<_> = self.entries.lock().drain().collect();
        if !entries.is_empty() {
            tracing::trace!(keys = entries.len(), "closing keyed signals");
        }
        for (_, (_, observer)) in entries {
            observer.send_completed();
        }
    }
}

impl<V> Drop for KeyedSignals<V> {
    fn drop(&mut self) {
        for (_, (_, observer)) in self.entries.get_mut().drain() {
            observer.send_completed();
        }
    }
}

impl<V: Clone + Send + 'static> Default for KeyedSignals<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for KeyedSignals<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedSignals")
            .field("keys", &self.entries.lock().len())
            .finish()
    }
}

/// A persistent key-value settings store.
pub trait SettingsStore<V>: Send + Sync {
    /// The value stored under `key`.
    fn get(&self, key: &str) -> Option<V>;

    /// Store `value` under `key` and notify observers of `key`.
    fn set(&self, key: &str, value: V);

    /// Remove `key`, notifying observers if it was present.
    fn remove(&self, key: &str);

    /// Persist pending writes.
    fn synchronize(&self) -> Result<(), SettingsError>;

    /// Changes of `key`, delivered as `(key, new value)`.
    fn observe(&self, key: &str) -> Signal<Change<V>, NoError>;
}

/// An in-memory [`SettingsStore`].
pub struct MemorySettings<V> {
    values: Mutex<HashMap<String, V>>,
    /// Serializes a write with its notification, so the last change
    /// observers see is the value left in the store. Reentrant so observers
    /// may write from a callback.
    write_lock: ReentrantMutex<()>,
    changes: KeyedSignals<V>,
}

impl<V> MemorySettings<V>
where
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            write_lock: ReentrantMutex::new(()),
            changes: KeyedSignals::new(),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl<V: Clone + Send + 'static> Default for MemorySettings<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SettingsStore<V> for MemorySettings<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: V) {
        let _serial = self.write_lock.lock();
        self.values.lock().insert(key.to_owned(), value.clone());
        self.changes.notify_changed(key, Some(value));
    }

    fn remove(&self, key: &str) {
        let _serial = self.write_lock.lock();
        let removed = self.values.lock().remove(key).is_some();
        if removed {
            self.changes.notify_changed(key, None);
        }
    }

    fn synchronize(&self) -> Result<(), SettingsError> {
        Ok(())
    }

    fn observe(&self, key: &str) -> Signal<Change<V>, NoError> {
        self.changes.signal_for(key)
    }
}

impl<V> fmt::Debug for MemorySettings<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySettings")
            .field("keys", &self.values.lock().len())
            .field("changes", &self.changes)
            .finish()
    }
}

/// Producer based access to a shared [`SettingsStore`].
///
/// Writes happen when the returned producer is started, not when it is
/// built; starting it twice writes twice.
pub trait ReactiveSettings<V> {
    /// Store `value` under `key`, then complete.
    fn set_producer(&self, key: &str, value: V) -> SignalProducer<(), NoError>;

    /// Remove `key`, then complete.
    fn remove_producer(&self, key: &str) -> SignalProducer<(), NoError>;

    /// Emit the current value of `key`, then complete.
    fn value_producer(&self, key: &str) -> SignalProducer<Option<V>, NoError>;

    /// Persist pending writes, then complete, or fail.
    fn synchronize_producer(&self) -> SignalProducer<(), SettingsError>;
}

impl<V, S> ReactiveSettings<V> for Arc<S>
where
    V: Clone + Send + Sync + 'static,
    S: SettingsStore<V> + ?Sized + 'static,
{
    fn set_producer(&self, key: &str, value: V) -> SignalProducer<(), NoError> {
        let store = Arc::clone(self);
        let key = key.to_owned();
        SignalProducer::new(move |observer, _| {
            store.set(&key, value.clone());
            observer.send_completed();
        })
    }

    fn remove_producer(&self, key: &str) -> SignalProducer<(), NoError> {
        let store = Arc::clone(self);
        let key = key.to_owned();
        SignalProducer::new(move |observer, _| {
            store.remove(&key);
            observer.send_completed();
        })
    }

    fn value_producer(&self, key: &str) -> SignalProducer<Option<V>, NoError> {
        let store = Arc::clone(self);
        let key = key.to_owned();
        SignalProducer::new(move |observer, _| {
            observer.send_next(store.get(&key));
            observer.send_completed();
        })
    }

    fn synchronize_producer(&self) -> SignalProducer<(), SettingsError> {
        let store = Arc::clone(self);
        SignalProducer::new(move |observer, _| match store.synchronize() {
            Ok(()) => observer.send_completed(),
            Err(error) => {
                tracing::debug!(%error, "settings synchronization failed");
                observer.send_failed(error);
            }
        })
    }
}
