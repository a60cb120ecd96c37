// FilterState <-> flat URL query string.
// Defaults are omitted, multi-selects join with ',' and decoding never fails:
// unknown keys are ignored and malformed values count as absent.

use crate::filters::ordered;
use crate::models::{FilterPatch, FilterState, SortOrder};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Delimiter joining the tokens of a multi-select facet.
pub const SET_DELIMITER: char = ',';
/// Separator between brand and model inside a `model` token.
pub const MODEL_SEPARATOR: char = ':';

// Everything except RFC 3986 unreserved characters gets escaped,
// which covers the set delimiter and the model separator.
const TOKEN: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn escape(token: &str) -> String {
    utf8_percent_encode(token, TOKEN).to_string()
}

fn unescape(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn join_set<'a>(tokens: impl IntoIterator<Item = &'a String>) -> String {
    tokens
        .into_iter()
        .map(|t| escape(t))
        .collect::<Vec<_>>()
        .join(&SET_DELIMITER.to_string())
}

pub fn encode(filters: &FilterState) -> String {
    let mut pairs: Vec<(&str, String)> = Vec::new();

    if !filters.search.trim().is_empty() {
        pairs.push(("search", escape(&filters.search)));
    }

    let ranges = [
        ("price_min", filters.price_min),
        ("price_max", filters.price_max),
        ("year_min", filters.year_min.map(u64::from)),
        ("year_max", filters.year_max.map(u64::from)),
        ("km_min", filters.km_min),
        ("km_max", filters.km_max),
    ];
    for (key, value) in ranges {
        if let Some(value) = value {
            pairs.push((key, value.to_string()));
        }
    }

    if !filters.brand.is_empty() {
        pairs.push(("brand", join_set(&filters.brand)));
    }
    let model_tokens: Vec<String> = filters
        .models
        .iter()
        .flat_map(|(brand, models)| {
            models
                .iter()
                .map(move |model| format!("{}{MODEL_SEPARATOR}{}", escape(brand), escape(model)))
        })
        .collect();
    if !model_tokens.is_empty() {
        pairs.push(("model", model_tokens.join(&SET_DELIMITER.to_string())));
    }

    for (key, set) in [
        ("fuel", &filters.fuel),
        ("body", &filters.body),
        ("transmission", &filters.transmission),
        ("color", &filters.color),
    ] {
        if !set.is_empty() {
            pairs.push((key, join_set(set)));
        }
    }

    if filters.ordering != SortOrder::default() {
        pairs.push(("ordering", filters.ordering.as_token().to_string()));
    }
    if filters.page > 1 {
        pairs.push(("page", filters.page.to_string()));
    }

    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_number<T: FromStr>(raw: &str) -> Option<T> {
    let text = unescape(raw);
    let text = text.trim();
    // Reject signs so "-5" and "+5" do not sneak through FromStr
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

// Split on the raw delimiter first: escaped delimiters inside tokens survive
fn decode_set(raw: &str) -> BTreeSet<String> {
    raw.split(SET_DELIMITER)
        .map(|token| unescape(token).trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

fn decode_models(raw: &str) -> BTreeMap<String, BTreeSet<String>> {
    let mut models: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for token in raw.split(SET_DELIMITER) {
        let Some((brand, model)) = token.split_once(MODEL_SEPARATOR) else {
            continue;
        };
        let brand = unescape(brand).trim().to_string();
        let model = unescape(model).trim().to_string();
        if brand.is_empty() || model.is_empty() {
            continue;
        }
        models.entry(brand).or_default().insert(model);
    }
    models
}

pub fn decode(query: &str) -> FilterPatch {
    let query = query.trim();
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut patch = FilterPatch::default();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = unescape(raw_key);
        match key.trim() {
            "search" => {
                let text = unescape(raw_value).trim().to_string();
                patch.search = (!text.is_empty()).then_some(text);
            }
            "price_min" => patch.price_min = decode_number(raw_value),
            "price_max" => patch.price_max = decode_number(raw_value),
            "year_min" => patch.year_min = decode_number(raw_value),
            "year_max" => patch.year_max = decode_number(raw_value),
            "km_min" => patch.km_min = decode_number(raw_value),
            "km_max" => patch.km_max = decode_number(raw_value),
            "brand" => patch.brand = decode_set(raw_value),
            "model" => patch.models = decode_models(raw_value),
            "fuel" => patch.fuel = decode_set(raw_value),
            "body" => patch.body = decode_set(raw_value),
            "transmission" => patch.transmission = decode_set(raw_value),
            "color" => patch.color = decode_set(raw_value),
            "ordering" => patch.ordering = SortOrder::from_token(&unescape(raw_value)),
            "page" => patch.page = decode_number::<u32>(raw_value).filter(|page| *page >= 1),
            other => tracing::trace!(key = other, "ignoring unknown query key"),
        }
    }

    (patch.price_min, patch.price_max) = ordered(patch.price_min, patch.price_max);
    (patch.year_min, patch.year_max) = ordered(patch.year_min, patch.year_max);
    (patch.km_min, patch.km_max) = ordered(patch.km_min, patch.km_max);
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Facet;
    use pretty_assertions::assert_eq;

    fn round_trip(filters: &FilterState) -> FilterState {
        FilterState::default().apply_patch(decode(&encode(filters)))
    }

    #[test]
    fn default_state_encodes_to_empty_query() {
        assert_eq!(encode(&FilterState::default()), "");
    }

    #[test]
    fn price_and_fuel_example() {
        let mut filters = FilterState::default();
        filters.set_price_range(Some(500_000), Some(1_000_000));
        filters.toggle(Facet::Fuel, "Petrol");

        let query = encode(&filters);
        assert_eq!(query, "price_min=500000&price_max=1000000&fuel=Petrol");

        let patch = decode(&query);
        assert_eq!(patch.price_min, Some(500_000));
        assert_eq!(patch.price_max, Some(1_000_000));
        assert_eq!(patch.fuel, BTreeSet::from(["Petrol".to_string()]));
        assert_eq!(
            FilterState::default().apply_patch(patch),
            filters
        );
    }

    #[test]
    fn multi_select_joins_with_comma() {
        let mut filters = FilterState::default();
        filters.set_facet(Facet::Brand, ["Toyota", "Honda"]);
        assert_eq!(encode(&filters), "brand=Honda,Toyota");
    }

    #[test]
    fn tokens_containing_the_delimiter_round_trip() {
        let mut filters = FilterState::default();
        filters.set_facet(Facet::Color, ["Red, Metallic", "Pearl White"]);
        filters.toggle_model("Rolls:Royce", "Ghost");

        let query = encode(&filters);
        assert!(query.contains("Red%2C%20Metallic"), "{query}");
        assert!(query.contains("model=Rolls%3ARoyce:Ghost"), "{query}");
        assert_eq!(round_trip(&filters), filters);
    }

    #[test]
    fn representative_states_round_trip() {
        let mut everything = FilterState::default();
        everything.set_search("automatic sunroof 7 seater");
        everything.set_price_range(Some(250_000), None);
        everything.set_year_range(Some(2016), Some(2021));
        everything.set_km_range(None, Some(60_000));
        everything.toggle_model("Hyundai", "Creta");
        everything.toggle_model("Hyundai", "i20");
        everything.toggle(Facet::Brand, "Kia");
        everything.set_facet(Facet::Body, ["SUV", "Hatchback"]);
        everything.toggle(Facet::Transmission, "Automatic");
        everything.set_ordering(SortOrder::KmAsc);
        everything.set_page(3);

        let mut search_with_symbols = FilterState::default();
        search_with_symbols.set_search("c++ & 100% = fun?");

        for filters in [FilterState::default(), everything, search_with_symbols] {
            assert_eq!(round_trip(&filters), filters);
        }
    }

    #[test]
    fn decoding_is_total() {
        let patch = decode("?price_min=abc&year_max=-2019&km_max=1e5&brand=&page=0&utm_source=mail&ordering=cheapest&=x&&fuel");
        assert_eq!(patch, FilterPatch::default());
    }

    #[test]
    fn decoding_swaps_inverted_ranges() {
        let patch = decode("price_min=900000&price_max=100000&year_min=2020&year_max=2010");
        assert_eq!((patch.price_min, patch.price_max), (Some(100_000), Some(900_000)));
        assert_eq!((patch.year_min, patch.year_max), (Some(2010), Some(2020)));
    }

    #[test]
    fn plus_decodes_to_space_and_blank_tokens_drop() {
        let patch = decode("search=honda+city&fuel=Petrol,,%20,Diesel");
        assert_eq!(patch.search.as_deref(), Some("honda city"));
        assert_eq!(
            patch.fuel,
            BTreeSet::from(["Diesel".to_string(), "Petrol".to_string()])
        );
    }

    #[test]
    fn last_occurrence_wins() {
        let patch = decode("ordering=price_asc&ordering=year_desc&page=2&page=4");
        assert_eq!(patch.ordering, Some(SortOrder::YearDesc));
        assert_eq!(patch.page, Some(4));
    }

    #[test]
    fn models_are_grouped_by_brand() {
        let patch = decode("model=Honda:City,Honda:Jazz,Toyota:Innova,broken");
        assert_eq!(patch.models.len(), 2);
        assert_eq!(patch.models["Honda"].len(), 2);
        assert!(patch.models["Toyota"].contains("Innova"));
    }
}
