// Inventory sources: the remote paginated endpoint and the in-memory catalog

use anyhow::{Context, Result};
use async_trait::async_trait;
use cached::{Cached, TimedSizedCache};
use reqwest::{Client, Url, header::ACCEPT};
use std::{fs, path::Path, time::Duration};
use tokio::sync::Mutex;

use crate::{
    config::Settings,
    error::{FetchError, FetchResult},
    matcher,
    models::{FilterState, ListingItem, ResultPage},
    query_codec,
    vocabulary::FacetVocabulary,
};

const USER_AGENT: &str = concat!("car-catalog/", env!("CARGO_PKG_VERSION"));

/// Anything that can serve pages of listings.
///
/// `first_page` serves a replace fetch for a filter set; `page_at` follows an
/// opaque cursor previously returned in [`ResultPage::next_cursor`].
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn first_page(&self, filters: &FilterState) -> FetchResult<ResultPage>;
    async fn page_at(&self, cursor: &str) -> FetchResult<ResultPage>;
}

// Build the shared reqwest client with the configured timeout
pub fn build_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(settings.request_timeout())
        .connect_timeout(Duration::from_secs(10).min(settings.request_timeout()))
        .build()
        .context("Failed to build reqwest client")
}

// --- Remote endpoint ---

pub struct HttpInventory {
    client: Client,
    base_url: Url,
    listing_url: Url,
    // Keyed by full request URL, entries expire after the configured TTL
    cache: Option<Mutex<TimedSizedCache<String, ResultPage>>>,
}

impl HttpInventory {
    pub fn new(client: Client, settings: &Settings) -> Result<Self> {
        let base_url = Url::parse(&settings.api_base_url)
            .with_context(|| format!("Invalid api_base_url '{}'", settings.api_base_url))?;
        let listing_url = base_url
            .join(&settings.listing_path)
            .with_context(|| format!("Invalid listing_path '{}'", settings.listing_path))?;
        let cache = (settings.response_cache_capacity > 0 && settings.response_cache_ttl_secs > 0).then(|| {
            Mutex::new(TimedSizedCache::with_size_and_lifespan(
                settings.response_cache_capacity,
                settings.response_cache_ttl_secs,
            ))
        });

        Ok(Self {
            client,
            base_url,
            listing_url,
            cache,
        })
    }

    /// `GET /api/cars/?<encoded filters>`
    pub fn listing_url(&self, filters: &FilterState) -> Url {
        let mut url = self.listing_url.clone();
        let query = query_codec::encode(filters);
        url.set_query((!query.is_empty()).then_some(query.as_str()));
        url
    }

    // Absolute cursors are used verbatim, relative ones resolve against the base
    fn cursor_url(&self, cursor: &str) -> FetchResult<Url> {
        self.base_url
            .join(cursor.trim())
            .map_err(|e| FetchError::InvalidCursor {
                cursor: cursor.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_page(&self, url: Url) -> FetchResult<ResultPage> {
        let key = url.to_string();
        if let Some(cache) = &self.cache {
            if let Some(page) = cache.lock().await.cache_get(&key) {
                tracing::debug!(url = %key, "serving page from response cache");
                return Ok(page.clone());
            }
        }

        tracing::debug!(url = %key, "requesting inventory page");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %key, status = %status, "inventory returned an error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        // Buffer first so a shape error reports the parse failure, not a transport one
        let body = response.bytes().await?;
        let page = serde_json::from_slice::<ResultPage>(&body)
            .map_err(|e| {
                tracing::debug!(url = %key, error = %e, body = %String::from_utf8_lossy(&body), "response body did not match the listing shape");
                FetchError::Malformed(e.to_string())
            })?
            .normalized();
        tracing::debug!(url = %key, items = page.items.len(), total = page.total_count, has_next = page.next_cursor.is_some(), "parsed inventory page");

        if let Some(cache) = &self.cache {
            cache.lock().await.cache_set(key, page.clone());
        }
        Ok(page)
    }
}

#[async_trait]
impl InventorySource for HttpInventory {
    async fn first_page(&self, filters: &FilterState) -> FetchResult<ResultPage> {
        self.get_page(self.listing_url(filters)).await
    }

    async fn page_at(&self, cursor: &str) -> FetchResult<ResultPage> {
        let url = self.cursor_url(cursor)?;
        self.get_page(url).await
    }
}

// --- In-memory catalog ---

/// Prefix of the cursors minted by [`LocalCatalog`].
pub const LOCAL_CURSOR_PREFIX: &str = "local:?";

/// The whole dataset held in memory, filtered and sorted client-side with
/// the shared matcher and served in fixed-size pages.
pub struct LocalCatalog {
    items: Vec<ListingItem>,
    vocabulary: FacetVocabulary,
    page_size: usize,
}

impl LocalCatalog {
    pub fn new(items: Vec<ListingItem>, vocabulary: FacetVocabulary, page_size: usize) -> Self {
        Self {
            items,
            vocabulary,
            page_size: page_size.max(1),
        }
    }

    // Accepts either a bare array of listings or a saved `{results, count, next}` page
    pub fn from_json_file(path: &Path, vocabulary: FacetVocabulary, page_size: usize) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read listings file {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse listings file {}", path.display()))?;
        let items: Vec<ListingItem> = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value::<ResultPage>(value).map(|page| page.items)
        }
        .with_context(|| format!("Unexpected listing shape in {}", path.display()))?;

        tracing::info!(path = %path.display(), items = items.len(), "loaded local catalog");
        Ok(Self::new(items, vocabulary, page_size))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Evaluate one page of `filters` (using `filters.page`).
    pub fn query(&self, filters: &FilterState) -> ResultPage {
        let mut matched: Vec<ListingItem> = matcher::filter_items(&self.items, filters, &self.vocabulary)
            .into_iter()
            .cloned()
            .collect();
        matcher::sort_items(&mut matched, filters.ordering);

        let total = matched.len();
        let page = filters.page.max(1) as usize;
        let start = (page - 1).saturating_mul(self.page_size);
        let items: Vec<ListingItem> = matched.into_iter().skip(start).take(self.page_size).collect();

        let next_cursor = (start.saturating_add(self.page_size) < total).then(|| {
            let next = filters.clone().with_page(filters.page.max(1) + 1);
            format!("{LOCAL_CURSOR_PREFIX}{}", query_codec::encode(&next))
        });

        ResultPage {
            items,
            total_count: total as u64,
            next_cursor,
        }
    }
}

#[async_trait]
impl InventorySource for LocalCatalog {
    async fn first_page(&self, filters: &FilterState) -> FetchResult<ResultPage> {
        Ok(self.query(filters))
    }

    async fn page_at(&self, cursor: &str) -> FetchResult<ResultPage> {
        let query = cursor
            .strip_prefix(LOCAL_CURSOR_PREFIX)
            .ok_or_else(|| FetchError::InvalidCursor {
                cursor: cursor.to_string(),
                reason: "not a local catalog cursor".to_string(),
            })?;
        let filters = FilterState::default().apply_patch(query_codec::decode(query));
        Ok(self.query(&filters))
    }
}
