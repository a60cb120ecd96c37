// A browse session: owns the filter state and wires URL sync to the fetch orchestrator.
// Flow: edit -> URL replace -> debounced replace fetch.

use crate::models::FilterState;
use crate::orchestrator::FetchOrchestrator;
use crate::state::ListingState;
use crate::url_sync::{Location, SyncPhase, UrlSyncController};

pub struct CatalogSession<L: Location> {
    filters: FilterState,
    url_sync: UrlSyncController<L>,
    orchestrator: FetchOrchestrator,
}

impl<L: Location> CatalogSession<L> {
    pub fn new(location: L, orchestrator: FetchOrchestrator) -> Self {
        Self {
            filters: FilterState::default(),
            url_sync: UrlSyncController::new(location),
            orchestrator,
        }
    }

    /// Hydrate from the location and schedule the first replace fetch.
    pub async fn start(&mut self, base: FilterState) -> &FilterState {
        if self.url_sync.phase() == SyncPhase::Hydrating {
            self.filters = self.url_sync.hydrate(base);
            self.orchestrator.set_filters(self.filters.clone()).await;
        }
        &self.filters
    }

    /// Apply an edit. Returns `false` when the edit changed nothing.
    pub async fn update<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut FilterState),
    {
        let mut next = self.filters.clone();
        edit(&mut next);
        next.normalize();
        if next == self.filters {
            return false;
        }
        self.filters = next;
        self.url_sync.publish(&self.filters);
        self.orchestrator.set_filters(self.filters.clone()).await;
        true
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn listing(&self) -> ListingState {
        self.orchestrator.snapshot()
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    pub fn location(&self) -> &L {
        self.url_sync.location()
    }
}
