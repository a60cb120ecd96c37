// Faceted filtering, URL synchronization and incremental pagination for a used-car catalog.
// models/filters hold the filter state, query_codec maps it to a query string,
// orchestrator and scroll fetch pages, session ties them to url_sync.

pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod inventory;
pub mod matcher;
pub mod models;
pub mod orchestrator;
pub mod query_codec;
pub mod scroll;
pub mod session;
pub mod state;
pub mod url_sync;
pub mod vocabulary;

pub use error::{FetchError, FetchResult};
pub use inventory::{HttpInventory, InventorySource, LocalCatalog};
pub use models::{Facet, FilterPatch, FilterState, ListingItem, RangeKind, ResultPage, SortOrder};
pub use orchestrator::{FetchOrchestrator, OrchestratorConfig};
pub use session::CatalogSession;
pub use state::ListingState;
