// Debounced, cancelable inventory requests driven by filter changes.
// Each replace fetch mints an epoch and aborts whatever is in flight; responses
// apply only while their epoch is current. Appends follow the server cursor
// under the epoch they started in. Snapshots go out on a watch channel.

use futures::future::{AbortHandle, Abortable};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};

use crate::{
    config::Settings,
    error::{FetchError, FetchResult},
    inventory::InventorySource,
    models::{FilterState, ResultPage},
    query_codec,
    state::ListingState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub debounce: Duration,
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl From<&Settings> for OrchestratorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            debounce: settings.debounce(),
            request_timeout: settings.request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailedRequest {
    Replace,
    Append,
}

#[derive(Default)]
struct Control {
    epoch: u64,
    // Latest filters handed to set_filters
    scheduled: Option<FilterState>,
    debounce: Option<JoinHandle<()>>,
    replace: Option<AbortHandle>,
    append: Option<AbortHandle>,
    last_failure: Option<FailedRequest>,
}

struct Shared {
    source: Arc<dyn InventorySource>,
    config: OrchestratorConfig,
    state: watch::Sender<ListingState>,
    control: Mutex<Control>,
}

/// Cheap to clone; all clones drive the same listing.
#[derive(Clone)]
pub struct FetchOrchestrator {
    shared: Arc<Shared>,
}

impl FetchOrchestrator {
    pub fn new(source: Arc<dyn InventorySource>, config: OrchestratorConfig) -> Self {
        let (state, _) = watch::channel(ListingState::default());
        Self {
            shared: Arc::new(Shared {
                source,
                config,
                state,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    pub fn config(&self) -> OrchestratorConfig {
        self.shared.config
    }

    pub fn snapshot(&self) -> ListingState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListingState> {
        self.shared.state.subscribe()
    }

    /// Schedule a replace fetch for `filters` after the debounce window.
    ///
    /// Returns `false` when only the page differs from the last scheduled
    /// filters (or nothing changed), in which case no fetch is scheduled.
    pub async fn set_filters(&self, filters: FilterState) -> bool {
        let mut control = self.shared.control.lock().await;
        if control
            .scheduled
            .as_ref()
            .is_some_and(|scheduled| scheduled.same_facets(&filters))
        {
            tracing::trace!("filters unchanged apart from page, nothing scheduled");
            return false;
        }

        if let Some(timer) = control.debounce.take() {
            timer.abort();
            tracing::trace!("debounce timer re-armed");
        }
        control.scheduled = Some(filters);

        let shared = Arc::clone(&self.shared);
        let delay = shared.config.debounce;
        control.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut control = shared.control.lock().await;
            control.debounce = None;
            shared.start_replace(&mut control);
        }));
        self.shared.state.send_modify(ListingState::arm_debounce);
        true
    }

    /// Fire an armed debounce timer right away. Returns whether one was armed.
    pub async fn flush(&self) -> bool {
        let mut control = self.shared.control.lock().await;
        match control.debounce.take() {
            Some(timer) => {
                timer.abort();
                self.shared.start_replace(&mut control);
                true
            }
            None => false,
        }
    }

    /// Request the next page if the listing allows it.
    pub async fn load_more(&self) -> bool {
        let mut control = self.shared.control.lock().await;
        let cursor = {
            let listing = self.shared.state.borrow();
            if !listing.can_load_more() {
                return false;
            }
            listing.next_cursor.clone()
        };
        match cursor {
            Some(cursor) => {
                self.shared.start_append(&mut control, cursor);
                true
            }
            None => false,
        }
    }

    /// Re-issue the request that failed last, if any.
    pub async fn retry(&self) -> bool {
        let mut control = self.shared.control.lock().await;
        match control.last_failure {
            Some(FailedRequest::Replace) => {
                if let Some(timer) = control.debounce.take() {
                    timer.abort();
                }
                tracing::info!("retrying replace fetch");
                self.shared.start_replace(&mut control);
                true
            }
            Some(FailedRequest::Append) => {
                let cursor = {
                    let listing = self.shared.state.borrow();
                    if !listing.can_load_more() {
                        return false;
                    }
                    listing.next_cursor.clone()
                };
                let Some(cursor) = cursor else {
                    return false;
                };
                tracing::info!("retrying append fetch");
                self.shared.start_append(&mut control, cursor);
                true
            }
            None => false,
        }
    }

    /// Wait until no debounce timer is armed and no request is in flight.
    pub async fn settled(&self) -> ListingState {
        let mut receiver = self.shared.state.subscribe();
        // The sender lives in `shared`, so the channel cannot close while we wait
        match receiver.wait_for(ListingState::is_idle).await {
            Ok(listing) => ListingState::clone(&listing),
            Err(_) => self.snapshot(),
        }
    }

    /// Cancel the debounce timer and every in-flight request.
    pub async fn cancel_all(&self) {
        let mut control = self.shared.control.lock().await;
        if let Some(timer) = control.debounce.take() {
            timer.abort();
        }
        control.epoch += 1;
        // The same facets can be scheduled again after a cancel
        control.scheduled = None;
        abort_in_flight(&mut control);
        self.shared.state.send_modify(|listing| {
            listing.pending = false;
            listing.loading = false;
            listing.loading_more = false;
        });
        tracing::debug!(epoch = control.epoch, "cancelled all listing requests");
    }
}

fn abort_in_flight(control: &mut Control) {
    if let Some(request) = control.replace.take() {
        request.abort();
        tracing::debug!("aborted in-flight replace fetch");
    }
    if let Some(request) = control.append.take() {
        request.abort();
        tracing::debug!("aborted in-flight append fetch");
    }
}

impl Shared {
    async fn bounded<T>(&self, request: impl Future<Output = FetchResult<T>>) -> FetchResult<T> {
        tokio::time::timeout(self.config.request_timeout, request)
            .await
            .unwrap_or(Err(FetchError::Timeout))
    }

    fn start_replace(self: &Arc<Self>, control: &mut Control) {
        // Replace fetches always start at page 1; later pages follow the cursor
        let Some(filters) = control.scheduled.clone().map(|f| f.with_page(1)) else {
            return;
        };
        control.epoch += 1;
        let epoch = control.epoch;
        abort_in_flight(control);

        let (handle, registration) = AbortHandle::new_pair();
        control.replace = Some(handle);
        self.state.send_modify(ListingState::begin_replace);
        tracing::debug!(epoch, query = %query_codec::encode(&filters), "issuing replace fetch");

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let request = shared.bounded(shared.source.first_page(&filters));
            match Abortable::new(request, registration).await {
                Ok(outcome) => shared.apply_replace(epoch, outcome).await,
                Err(_aborted) => tracing::debug!(epoch, "replace fetch aborted"),
            }
        });
    }

    fn start_append(self: &Arc<Self>, control: &mut Control, cursor: String) {
        let epoch = control.epoch;
        let (handle, registration) = AbortHandle::new_pair();
        control.append = Some(handle);
        self.state.send_modify(ListingState::begin_append);
        tracing::debug!(epoch, cursor = %cursor, "issuing append fetch");

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let request = shared.bounded(shared.source.page_at(&cursor));
            match Abortable::new(request, registration).await {
                Ok(outcome) => shared.apply_append(epoch, outcome).await,
                Err(_aborted) => tracing::debug!(epoch, "append fetch aborted"),
            }
        });
    }

    async fn apply_replace(&self, epoch: u64, outcome: FetchResult<ResultPage>) {
        let mut control = self.control.lock().await;
        if control.epoch != epoch {
            tracing::debug!(epoch, current = control.epoch, "discarding stale replace response");
            return;
        }
        control.replace = None;
        match outcome {
            Ok(page) => {
                tracing::info!(
                    epoch,
                    items = page.items.len(),
                    total = page.total_count,
                    has_more = page.next_cursor.is_some(),
                    "replace fetch applied"
                );
                control.last_failure = None;
                self.state.send_modify(|listing| listing.finish_replace(page));
            }
            Err(error) => {
                tracing::warn!(epoch, error = %error, "replace fetch failed");
                control.last_failure = Some(FailedRequest::Replace);
                self.state.send_modify(|listing| listing.fail_replace(error));
            }
        }
    }

    async fn apply_append(&self, epoch: u64, outcome: FetchResult<ResultPage>) {
        let mut control = self.control.lock().await;
        if control.epoch != epoch {
            tracing::debug!(epoch, current = control.epoch, "discarding append response from a superseded listing");
            return;
        }
        control.append = None;
        match outcome {
            Ok(page) => {
                let mut added = 0;
                self.state.send_modify(|listing| added = listing.finish_append(page));
                control.last_failure = None;
                tracing::info!(epoch, added, "append fetch applied");
            }
            Err(error) => {
                tracing::warn!(epoch, error = %error, "append fetch failed");
                control.last_failure = Some(FailedRequest::Append);
                self.state.send_modify(|listing| listing.fail_append(error));
            }
        }
    }
}
