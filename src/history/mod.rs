//! Rolling history of analysis results.
//!
//! `LogStore` keeps the newest `capacity` entries (newest first), mirrors them
//! to a [`HistoryStorage`] slot on every change, and notifies subscribers.
//! Each append re-reads the slot first, so entries cleared or added by
//! another store on the same slot are respected. Storage failures are logged
//! and swallowed; the in-memory mirror is used when the slot is unreadable.

pub mod storage;
pub mod types;

pub use storage::{HistoryStorage, JsonFileStorage, MemoryStorage, StorageError};
pub use types::{HistoryChange, LogEntry, SubscriptionId};

use crate::agent::AnalysisResult;
use crate::config::MAX_HISTORY;
use chrono::{SubsecRound, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type Listener = Arc<dyn Fn(&HistoryChange) + Send + Sync>;

/// Bounded, persisted, observable history of analysis results.
pub struct LogStore {
    entries: RwLock<VecDeque<LogEntry>>,
    storage: Box<dyn HistoryStorage>,
    capacity: usize,
    /// Whether the slot held our history at the last load or save.
    /// Only touched under the `entries` write lock.
    persisted: AtomicBool,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl LogStore {
    /// Open a store over `storage`, loading whatever it holds.
    ///
    /// A missing slot yields an empty history; an unreadable or corrupt slot
    /// is logged and also treated as empty. `capacity` is clamped to
    /// `1..=MAX_HISTORY`.
    pub fn open(storage: Box<dyn HistoryStorage>, capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_HISTORY);

        let (mut entries, persisted): (VecDeque<LogEntry>, bool) = match storage.load() {
            Ok(Some(entries)) => (entries.into(), true),
            Ok(None) => (VecDeque::new(), false),
            Err(e) => {
                tracing::warn!(error = %e, "Persisted history unreadable, starting empty");
                (VecDeque::new(), false)
            }
        };
        entries.truncate(capacity);

        tracing::debug!(entries = entries.len(), capacity, "History loaded");

        Self {
            entries: RwLock::new(entries),
            storage,
            capacity,
            persisted: AtomicBool::new(persisted),
            listeners: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryStorage::new()), MAX_HISTORY)
    }

    /// Commit a result as the newest entry.
    ///
    /// Re-reads the slot, assigns `id` and `timestamp`, drops entries beyond
    /// capacity, persists the full history, then notifies subscribers.
    pub fn append(&self, result: AnalysisResult) -> LogEntry {
        let entry = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            self.resync(&mut entries);

            let timestamp = Utc::now().trunc_subsecs(3);
            let now_ms = timestamp.timestamp_millis();
            let id = match entries.front() {
                Some(newest) if newest.id >= now_ms => newest.id + 1,
                _ => now_ms,
            };

            let entry = LogEntry {
                id,
                timestamp,
                result,
            };
            entries.push_front(entry.clone());
            entries.truncate(self.capacity);

            // Persist under the write lock so slot writes land in order
            match self.storage.save(entries.make_contiguous()) {
                Ok(()) => self.persisted.store(true, Ordering::Relaxed),
                Err(e) => {
                    self.persisted.store(false, Ordering::Relaxed);
                    tracing::warn!(error = %e, entry_id = id, "Failed to persist history");
                }
            }

            entry
        };

        tracing::debug!(entry_id = entry.id, "History entry appended");
        self.notify(&HistoryChange::Appended(entry.clone()));
        entry
    }

    /// Snapshot of the history, newest first.
    pub fn list(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Most recent entry, if any.
    pub fn latest(&self) -> Option<LogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .front()
            .cloned()
    }

    /// Empty the history and its persisted slot.
    pub fn clear(&self) {
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.clear();
            self.persisted.store(false, Ordering::Relaxed);

            if let Err(e) = self.storage.clear() {
                tracing::warn!(error = %e, "Failed to clear persisted history");
            }
        }

        tracing::info!("History cleared");
        self.notify(&HistoryChange::Cleared);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register a callback invoked once per `append` or `clear`.
    ///
    /// Callbacks run on the mutating caller's thread after the store lock is
    /// released, so they may read the store.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&HistoryChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Replace the mirror with the slot contents before a write.
    ///
    /// A slot that vanished after we wrote it was cleared elsewhere. A slot
    /// that was never written, or cannot be read, leaves the mirror as is.
    fn resync(&self, entries: &mut VecDeque<LogEntry>) {
        match self.storage.load() {
            Ok(Some(stored)) => {
                *entries = stored.into();
                entries.truncate(self.capacity);
            }
            Ok(None) if self.persisted.load(Ordering::Relaxed) => {
                tracing::info!("Persisted history was cleared elsewhere");
                entries.clear();
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Persisted history unreadable, using memory mirror");
            }
        }
    }

    fn notify(&self, change: &HistoryChange) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(change);
        }
    }
}
