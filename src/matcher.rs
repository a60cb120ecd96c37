// Client-side FilterState predicate over listing records.
// Tokens compare after trim + lowercase; a missing field fails an active check,
// and a range sitting on both vocabulary sentinels is not applied.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{FilterState, ListingItem, SortOrder};
use crate::vocabulary::{FacetVocabulary, RangeFacet};

pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn contains_token(selected: &BTreeSet<String>, value: &str) -> bool {
    let value = normalize_token(value);
    selected.iter().any(|token| normalize_token(token) == value)
}

fn matches_set(value: Option<&str>, selected: &BTreeSet<String>) -> bool {
    if selected.is_empty() {
        return true;
    }
    value.is_some_and(|value| contains_token(selected, value))
}

fn matches_brand_model(item: &ListingItem, filters: &FilterState) -> bool {
    let has_models = filters.models.values().any(|models| !models.is_empty());
    if filters.brand.is_empty() && !has_models {
        return true;
    }
    let Some(brand) = item.brand.as_deref() else {
        return false;
    };
    let brand = normalize_token(brand);

    // A model sub-selection overrides the coarser brand check for that brand
    let mut selected_models = filters
        .models
        .iter()
        .filter(|(selected_brand, _)| normalize_token(selected_brand) == brand)
        .flat_map(|(_, models)| models.iter())
        .peekable();
    if selected_models.peek().is_some() {
        let Some(model) = item.model.as_deref() else {
            return false;
        };
        let model = normalize_token(model);
        return selected_models.any(|selected| normalize_token(selected) == model);
    }

    filters
        .brand
        .iter()
        .any(|selected| normalize_token(selected) == brand)
}

fn matches_range(value: Option<u64>, min: Option<u64>, max: Option<u64>, bounds: &RangeFacet) -> bool {
    let (min, max) = bounds.effective(min, max);
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

/// Concatenation of the fields free-text search runs against.
pub fn search_haystack(item: &ListingItem) -> String {
    [
        &item.title,
        &item.brand,
        &item.model,
        &item.fuel,
        &item.body,
        &item.city,
        &item.transmission,
        &item.color,
    ]
    .into_iter()
    .filter_map(|field| field.as_deref())
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

fn matches_search(item: &ListingItem, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    needle.is_empty() || search_haystack(item).contains(&needle)
}

pub fn matches(item: &ListingItem, filters: &FilterState, vocabulary: &FacetVocabulary) -> bool {
    matches_brand_model(item, filters)
        && matches_set(item.fuel.as_deref(), &filters.fuel)
        && matches_set(item.body.as_deref(), &filters.body)
        && matches_set(item.transmission.as_deref(), &filters.transmission)
        && matches_set(item.color.as_deref(), &filters.color)
        && matches_range(item.price, filters.price_min, filters.price_max, &vocabulary.price)
        && matches_range(
            item.year.map(u64::from),
            filters.year_min.map(u64::from),
            filters.year_max.map(u64::from),
            &vocabulary.year,
        )
        && matches_range(item.km, filters.km_min, filters.km_max, &vocabulary.km)
        && matches_search(item, &filters.search)
}

/// Items satisfying `filters`, in their original order.
pub fn filter_items<'a>(
    items: &'a [ListingItem],
    filters: &FilterState,
    vocabulary: &FacetVocabulary,
) -> Vec<&'a ListingItem> {
    items
        .iter()
        .filter(|item| matches(item, filters, vocabulary))
        .collect()
}

// Missing keys always sort last, whatever the direction
fn ascending<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn descending<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        other => ascending(other.0, other.1),
    }
}

fn compare(a: &ListingItem, b: &ListingItem, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Newest => descending(a.created_at, b.created_at),
        SortOrder::Oldest => ascending(a.created_at, b.created_at),
        SortOrder::PriceAsc => ascending(a.price, b.price),
        SortOrder::PriceDesc => descending(a.price, b.price),
        SortOrder::KmAsc => ascending(a.km, b.km),
        SortOrder::KmDesc => descending(a.km, b.km),
        SortOrder::YearDesc => descending(a.year, b.year),
        SortOrder::YearAsc => ascending(a.year, b.year),
    }
}

/// In-memory ordering with the same keys the endpoint accepts; ties by id.
pub fn sort_items(items: &mut [ListingItem], order: SortOrder) {
    items.sort_by(|a, b| compare(a, b, order).then_with(|| a.id.cmp(&b.id)));
}
