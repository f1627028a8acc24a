//! Mood State Store
//!
//! Date -> mood mapping reconciled between the server and the local cache.
//!
//! # Write path
//!
//! ```text
//! set_mood(date, attrs)
//!   → merge into memory + mirror to cache   (visible immediately)
//!   → wait for the date's write guard
//!   → send the date's latest merged state   (skipped if already persisted)
//! ```
//!
//! Remote failures are reported but never rolled back; the next `load`
//! replaces local state with the server's. Because the guard serializes
//! writes per date and each write carries the latest local state, the server
//! ends up with the value of the last call in call order.
//!
//! # Stale responses
//!
//! `reset` bumps a generation counter. Responses that arrive for an older
//! generation are dropped before they touch state, as are load responses
//! overtaken by a newer load that already applied.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::aggregate::entries_in_month;
use super::remote::MoodRemote;
use super::types::{normalize_color, MoodAttrs, MoodEntry, MoodMap, TRANSPARENT};
use crate::cache::{keys, LocalCache};
use crate::calendar::MonthKey;
use crate::error::{Error, Result};

/// Outcome of a `load`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Server state replaced local state; number of entries loaded
    Loaded(usize),
    /// The store was reset while the request was in flight
    Discarded,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: MoodMap,
    /// Local write counter per date
    versions: HashMap<NaiveDate, u64>,
    /// Highest version known to be on the server
    persisted: HashMap<NaiveDate, u64>,
    /// `set_mood` calls currently running per date
    in_flight: HashMap<NaiveDate, usize>,
    generation: u64,
    /// Tickets handed out to `load` calls, and the newest one applied
    load_seq: u64,
    applied_load: u64,
    loaded: bool,
}

/// Reconciles mood entries between the server and the local cache
pub struct MoodStore {
    remote: Arc<dyn MoodRemote>,
    cache: Arc<LocalCache>,
    state: RwLock<StoreState>,
    write_guards: Mutex<HashMap<NaiveDate, Arc<tokio::sync::Mutex<()>>>>,
}

impl MoodStore {
    /// Create a store, hydrating from the local cache
    pub fn new(remote: Arc<dyn MoodRemote>, cache: Arc<LocalCache>) -> Self {
        let entries = match cache.get::<Vec<MoodEntry>>(keys::MOOD_ENTRIES) {
            Ok(Some(list)) => list.into_iter().map(|e| (e.date, e)).collect(),
            Ok(None) => MoodMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached mood entries");
                MoodMap::new()
            }
        };

        tracing::debug!(entries = entries.len(), "Mood store hydrated from cache");

        Self {
            remote,
            cache,
            state: RwLock::new(StoreState {
                entries,
                ..Default::default()
            }),
            write_guards: Mutex::new(HashMap::new()),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        let mut guards = self
            .write_guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guards.entry(date).or_default())
    }

    /// Mirror the in-memory map to the cache (best effort)
    fn mirror(&self, entries: &MoodMap) {
        let list: Vec<&MoodEntry> = entries.values().collect();
        if let Err(e) = self.cache.set(keys::MOOD_ENTRIES, &list) {
            tracing::warn!(error = %e, "Failed to mirror mood entries to cache");
        }
    }

    // ============================================
    // Reads
    // ============================================

    /// Entry for `date`, if one exists
    pub fn get(&self, date: NaiveDate) -> Option<MoodEntry> {
        self.read_state().entries.get(&date).cloned()
    }

    /// Copy of the whole mapping
    pub fn snapshot(&self) -> MoodMap {
        self.read_state().entries.clone()
    }

    /// Entries dated within `month`
    pub fn month(&self, month: MonthKey) -> MoodMap {
        let state = self.read_state();
        entries_in_month(&state.entries, month)
            .map(|e| (e.date, e.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().entries.is_empty()
    }

    /// Whether a server load has completed since creation or the last reset
    pub fn is_loaded(&self) -> bool {
        self.read_state().loaded
    }

    // ============================================
    // Load
    // ============================================

    /// Replace local state with the server's
    ///
    /// Dates with a `set_mood` still running keep their local value so an
    /// optimistic update is not clobbered by an older server copy.
    pub async fn load(&self, token: &str) -> Result<LoadOutcome> {
        if token.trim().is_empty() {
            return Err(Error::AuthRequired);
        }

        let (generation, ticket) = {
            let mut state = self.write_state();
            state.load_seq += 1;
            (state.generation, state.load_seq)
        };

        let fetched = match self.remote.fetch_moods(token).await {
            Ok(entries) => entries,
            Err(e) => {
                let err = Error::from(e);
                tracing::warn!(error = %err, "Failed to load mood entries");
                return Err(err);
            }
        };

        let mut state = self.write_state();
        if state.generation != generation {
            tracing::debug!("Discarding mood load for a reset store");
            return Ok(LoadOutcome::Discarded);
        }
        if state.applied_load > ticket {
            tracing::debug!(ticket, "Discarding mood load superseded by a newer one");
            return Ok(LoadOutcome::Discarded);
        }
        state.applied_load = ticket;

        let mut entries = MoodMap::new();
        for entry in fetched {
            let date = entry.date;
            let color = entry
                .color
                .filter(|c| !c.eq_ignore_ascii_case(TRANSPARENT))
                .and_then(|c| match normalize_color(&c) {
                    Ok(color) => Some(color),
                    Err(e) => {
                        tracing::warn!(%date, error = %e, "Dropping unrecognized server color");
                        None
                    }
                });
            let attrs = MoodAttrs {
                color,
                tag: entry.tag,
                sticker_id: entry.sticker_id,
            };
            entries
                .entry(date)
                .or_insert_with(|| MoodEntry::empty(date))
                .merge(&attrs);
        }

        let in_flight: Vec<NaiveDate> = state
            .in_flight
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(date, _)| *date)
            .collect();

        for date in &in_flight {
            if let Some(local) = state.entries.get(date) {
                entries.insert(*date, local.clone());
            }
        }

        state.versions.retain(|date, _| in_flight.contains(date));
        state.persisted.retain(|date, _| in_flight.contains(date));

        let count = entries.len();
        state.entries = entries;
        state.loaded = true;
        self.mirror(&state.entries);

        tracing::info!(entries = count, "Loaded mood entries from server");
        Ok(LoadOutcome::Loaded(count))
    }

    // ============================================
    // Write
    // ============================================

    /// Merge `attrs` into the entry for `date`
    ///
    /// The merged entry is visible to readers before this returns its first
    /// await. A remote failure is returned as an error but the local value
    /// stays in place.
    pub async fn set_mood(&self, token: &str, date: NaiveDate, attrs: MoodAttrs) -> Result<MoodEntry> {
        if token.trim().is_empty() {
            return Err(Error::AuthRequired);
        }
        let attrs = attrs.normalized()?;

        let (merged, generation) = {
            let mut state = self.write_state();
            let entry = state
                .entries
                .entry(date)
                .or_insert_with(|| MoodEntry::empty(date));
            entry.merge(&attrs);
            let merged = entry.clone();

            *state.versions.entry(date).or_insert(0) += 1;
            *state.in_flight.entry(date).or_insert(0) += 1;
            self.mirror(&state.entries);
            (merged, state.generation)
        };
        let _in_flight = InFlight { store: self, date };

        tracing::debug!(%date, "Applied mood update locally");

        let guard = self.write_guard(date);
        let _serialized = guard.lock().await;

        let pending = {
            let state = self.read_state();
            if state.generation != generation {
                tracing::debug!(%date, "Store reset before mood write was sent");
                return Ok(merged);
            }
            let version = state.versions.get(&date).copied().unwrap_or(0);
            let persisted = state.persisted.get(&date).copied().unwrap_or(0);
            if version <= persisted {
                None
            } else {
                state.entries.get(&date).cloned().map(|entry| (entry, version))
            }
        };

        let Some((entry, version)) = pending else {
            tracing::debug!(%date, "Mood already persisted by a later write");
            return Ok(merged);
        };

        match self.remote.save_mood(token, &entry).await {
            Ok(()) => {
                let mut state = self.write_state();
                if state.generation == generation {
                    let persisted = state.persisted.entry(date).or_insert(0);
                    *persisted = (*persisted).max(version);
                }
                tracing::debug!(%date, version, "Persisted mood entry");
                Ok(entry)
            }
            Err(e) => {
                let err = Error::from(e);
                tracing::warn!(%date, error = %err, "Failed to persist mood entry; keeping local value");
                Err(err)
            }
        }
    }

    /// Forget everything (logout)
    ///
    /// Responses to requests started before the reset are discarded.
    pub fn reset(&self) {
        let mut state = self.write_state();
        state.generation += 1;
        state.entries.clear();
        state.versions.clear();
        state.persisted.clear();
        state.loaded = false;

        if let Err(e) = self.cache.remove(keys::MOOD_ENTRIES) {
            tracing::warn!(error = %e, "Failed to clear cached mood entries");
        }
    }
}

/// Tracks a running `set_mood`; released on completion or cancellation
struct InFlight<'a> {
    store: &'a MoodStore,
    date: NaiveDate,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.store.write_state();
        if let Some(count) = state.in_flight.get_mut(&self.date) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.in_flight.remove(&self.date);
            }
        }
    }
}
