// Listing state and its transitions.
// The orchestrator decides when a transition applies (epoch checks).

use std::collections::HashSet;

use crate::error::FetchError;
use crate::models::{ListingItem, ResultPage};

/// Snapshot of the visible result list and its loading flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingState {
    pub items: Vec<ListingItem>,
    pub total_count: u64,
    /// Opaque cursor for the next page, as supplied by the server.
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// A replace fetch is in flight.
    pub loading: bool,
    /// An append fetch is in flight.
    pub loading_more: bool,
    /// A debounce timer is armed and a replace fetch will follow.
    pub pending: bool,
    pub error: Option<FetchError>,
    /// At least one replace fetch has completed.
    pub loaded_once: bool,
}

impl ListingState {
    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.loading_more && !self.loading && self.next_cursor.is_some()
    }

    pub fn is_idle(&self) -> bool {
        !self.pending && !self.loading && !self.loading_more
    }

    pub(crate) fn arm_debounce(&mut self) {
        self.pending = true;
    }

    // Starting a replace cancels any append in flight
    pub(crate) fn begin_replace(&mut self) {
        self.pending = false;
        self.loading = true;
        self.loading_more = false;
    }

    pub(crate) fn finish_replace(&mut self, page: ResultPage) {
        self.has_more = page.next_cursor.is_some();
        self.items = page.items;
        self.total_count = page.total_count;
        self.next_cursor = page.next_cursor;
        self.loading = false;
        self.error = None;
        self.loaded_once = true;
    }

    // Previous results stay visible unless nothing was ever loaded
    pub(crate) fn fail_replace(&mut self, error: FetchError) {
        if !self.loaded_once {
            self.items.clear();
            self.total_count = 0;
            self.next_cursor = None;
            self.has_more = false;
        }
        self.loading = false;
        self.error = Some(error);
        self.loaded_once = true;
    }

    pub(crate) fn begin_append(&mut self) {
        self.loading_more = true;
    }

    /// Append a page, skipping ids already listed. Returns how many were added.
    pub(crate) fn finish_append(&mut self, page: ResultPage) -> usize {
        let known: HashSet<String> = self.items.iter().map(|item| item.id.clone()).collect();
        let before = self.items.len();
        self.items
            .extend(page.items.into_iter().filter(|item| !known.contains(&item.id)));
        self.has_more = page.next_cursor.is_some();
        self.next_cursor = page.next_cursor;
        self.total_count = page.total_count;
        self.loading_more = false;
        self.error = None;
        self.items.len() - before
    }

    pub(crate) fn fail_append(&mut self, error: FetchError) {
        self.loading_more = false;
        self.error = Some(error);
    }
}
