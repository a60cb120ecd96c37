// Mirrors the filter state into the location's query string.
// Reads the location once, then only replaces the current entry.

use crate::models::FilterState;
use crate::query_codec;

/// The navigable location (the query part of the address bar).
pub trait Location {
    /// Current query string, with or without the leading `?`.
    fn query(&self) -> String;
    /// Overwrite the query of the current history entry without navigating.
    fn replace_query(&mut self, query: &str);
}

/// In-process [`Location`] keeping a list of history entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLocation {
    history: Vec<String>,
    replacements: usize,
}

impl MemoryLocation {
    pub fn new(query: &str) -> Self {
        Self {
            history: vec![strip_question_mark(query).to_string()],
            replacements: 0,
        }
    }

    /// A user navigation (deep link, back/forward target): pushes an entry.
    pub fn navigate(&mut self, query: &str) {
        self.history.push(strip_question_mark(query).to_string());
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("")
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> String {
        self.history.last().cloned().unwrap_or_default()
    }

    fn replace_query(&mut self, query: &str) {
        let query = strip_question_mark(query).to_string();
        match self.history.last_mut() {
            Some(current) => *current = query,
            None => self.history.push(query),
        }
        self.replacements += 1;
    }
}

fn strip_question_mark(query: &str) -> &str {
    query.strip_prefix('?').unwrap_or(query)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Hydrating,
    Synced,
}

pub struct UrlSyncController<L: Location> {
    location: L,
    phase: SyncPhase,
}

impl<L: Location> UrlSyncController<L> {
    pub fn new(location: L) -> Self {
        Self {
            location,
            phase: SyncPhase::Hydrating,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    pub fn into_location(self) -> L {
        self.location
    }

    /// Merge the location's query over `base` and switch to [`SyncPhase::Synced`].
    ///
    /// Never fails: undecodable keys keep their `base` values.
    pub fn hydrate(&mut self, base: FilterState) -> FilterState {
        if self.phase == SyncPhase::Synced {
            tracing::warn!("hydrate called after the location was already synced, ignoring");
            return base;
        }
        let query = self.location.query();
        let hydrated = base.apply_patch(query_codec::decode(&query));
        self.phase = SyncPhase::Synced;
        tracing::info!(query = %query, "hydrated filters from location");
        hydrated
    }

    /// Write `filters` into the location. Returns whether a write happened.
    pub fn publish(&mut self, filters: &FilterState) -> bool {
        if self.phase == SyncPhase::Hydrating {
            tracing::debug!("location write suppressed until hydration completes");
            return false;
        }
        let encoded = query_codec::encode(filters);
        let current = self.location.query();
        if strip_question_mark(&current) == encoded {
            return false;
        }
        tracing::debug!(query = %encoded, "replacing location query");
        self.location.replace_query(&encoded);
        true
    }
}
