// Scroll-triggered pagination: one append per sentinel observation
// once the sentinel is inside the look-ahead margin.

use crate::orchestrator::FetchOrchestrator;
use crate::state::ListingState;

pub const DEFAULT_LOOK_AHEAD_PX: u32 = 600;

/// Visibility-intersection mechanism of the host UI.
pub trait SentinelObserver {
    /// Start observing the element rendered for `sentinel`.
    fn observe(&mut self, sentinel: &str, margin_px: u32);
    /// Stop the current observation.
    fn disconnect(&mut self);
}

/// One intersection callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    pub sentinel: String,
    /// Pixels between the bottom of the viewport and the top of the
    /// sentinel; zero or negative once the sentinel is on screen.
    pub distance_px: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotObserving,
    StaleSentinel,
    OutsideMargin,
    AlreadyFired,
    Exhausted,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    Requested,
    Ignored(IgnoreReason),
}

#[derive(Debug)]
struct Observation {
    sentinel: String,
    fired: bool,
}

pub struct InfiniteScrollController<O: SentinelObserver> {
    orchestrator: FetchOrchestrator,
    observer: O,
    margin_px: u32,
    observed: Option<Observation>,
}

impl<O: SentinelObserver> InfiniteScrollController<O> {
    pub fn new(orchestrator: FetchOrchestrator, observer: O, margin_px: u32) -> Self {
        Self {
            orchestrator,
            observer,
            margin_px,
            observed: None,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn sentinel(&self) -> Option<&str> {
        self.observed.as_ref().map(|o| o.sentinel.as_str())
    }

    /// Re-arm against the current listing. Call after every listing change.
    pub fn sync(&mut self, listing: &ListingState) {
        let desired = if listing.has_more {
            listing.items.last().map(|item| item.id.as_str())
        } else {
            None
        };

        if let Some(observation) = self.observed.as_mut() {
            if Some(observation.sentinel.as_str()) == desired {
                // Same sentinel after a failed or empty append: allow another attempt
                if observation.fired && !listing.loading_more {
                    observation.fired = false;
                }
                return;
            }
        } else if desired.is_none() {
            return;
        }

        if self.observed.take().is_some() {
            self.observer.disconnect();
        }
        if let Some(sentinel) = desired {
            tracing::trace!(sentinel, margin_px = self.margin_px, "observing new sentinel");
            self.observer.observe(sentinel, self.margin_px);
            self.observed = Some(Observation {
                sentinel: sentinel.to_string(),
                fired: false,
            });
        } else {
            tracing::debug!("listing exhausted, sentinel observer disconnected");
        }
    }

    pub async fn on_intersection(&mut self, event: &Intersection) -> ScrollOutcome {
        let Some(observation) = self.observed.as_mut() else {
            return ScrollOutcome::Ignored(IgnoreReason::NotObserving);
        };
        if observation.sentinel != event.sentinel {
            return ScrollOutcome::Ignored(IgnoreReason::StaleSentinel);
        }
        if event.distance_px > i64::from(self.margin_px) {
            return ScrollOutcome::Ignored(IgnoreReason::OutsideMargin);
        }
        if observation.fired {
            return ScrollOutcome::Ignored(IgnoreReason::AlreadyFired);
        }

        let listing = self.orchestrator.snapshot();
        if !listing.has_more || listing.next_cursor.is_none() {
            return ScrollOutcome::Ignored(IgnoreReason::Exhausted);
        }
        if listing.loading || listing.loading_more || !self.orchestrator.load_more().await {
            return ScrollOutcome::Ignored(IgnoreReason::Busy);
        }

        observation.fired = true;
        tracing::debug!(sentinel = %event.sentinel, "sentinel visible, requested next page");
        ScrollOutcome::Requested
    }
}
