#![allow(dead_code)]

use async_trait::async_trait;
use car_catalog::{
    FetchError, FetchResult, FilterState, InventorySource, ListingItem, ResultPage, query_codec,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Inventory source answering from a script keyed by encoded query (first
/// pages) or cursor (follow-up pages). Unscripted requests answer HTTP 404.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, (Duration, FetchResult<ResultPage>)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, key: &str, delay_ms: u64, result: FetchResult<ResultPage>) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), (Duration::from_millis(delay_ms), result));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn serve(&self, key: String) -> FetchResult<ResultPage> {
        self.calls.lock().unwrap().push(key.clone());
        let scripted = self.responses.lock().unwrap().get(&key).cloned();
        match scripted {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Err(FetchError::Status { status: 404 }),
        }
    }
}

#[async_trait]
impl InventorySource for ScriptedSource {
    async fn first_page(&self, filters: &FilterState) -> FetchResult<ResultPage> {
        self.serve(query_codec::encode(filters)).await
    }

    async fn page_at(&self, cursor: &str) -> FetchResult<ResultPage> {
        self.serve(cursor.to_string()).await
    }
}

pub fn page(ids: &[&str], next: Option<&str>) -> ResultPage {
    ResultPage {
        items: ids.iter().map(|id| ListingItem::new(*id)).collect(),
        total_count: 100,
        next_cursor: next.map(str::to_string),
    }
}

pub fn ids(items: &[ListingItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

pub fn brands(tokens: &[&str]) -> FilterState {
    let mut filters = FilterState::default();
    filters.set_facet(car_catalog::Facet::Brand, tokens);
    filters
}
