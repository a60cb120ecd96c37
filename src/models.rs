// Data structures shared across the engine
// e.g., FilterState, ListingItem, ResultPage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// Sort keys understood by the inventory endpoint (and by the in-memory sorter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    KmAsc,
    KmDesc,
    YearDesc,
    YearAsc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 8] = [
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::PriceAsc,
        SortOrder::PriceDesc,
        SortOrder::KmAsc,
        SortOrder::KmDesc,
        SortOrder::YearDesc,
        SortOrder::YearAsc,
    ];

    /// Token used in the `ordering` query key.
    pub fn as_token(self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::KmAsc => "km_asc",
            SortOrder::KmDesc => "km_desc",
            SortOrder::YearDesc => "year_desc",
            SortOrder::YearAsc => "year_asc",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|order| order.as_token().eq_ignore_ascii_case(token))
    }
}

// Multi-select facets (OR semantics within a facet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Brand,
    Fuel,
    Body,
    Transmission,
    Color,
}

impl Facet {
    pub const ALL: [Facet; 5] = [
        Facet::Brand,
        Facet::Fuel,
        Facet::Body,
        Facet::Transmission,
        Facet::Color,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Facet::Brand => "brand",
            Facet::Fuel => "fuel",
            Facet::Body => "body",
            Facet::Transmission => "transmission",
            Facet::Color => "color",
        }
    }
}

// Numeric range facets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKind {
    Price,
    Year,
    Km,
}

/// Canonical representation of every active facet plus the page number.
///
/// The opaque next-page cursor is not part of this value: it belongs to the
/// listing state held by the fetch orchestrator and never enters the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub search: String,

    // Price (smallest currency unit), year & driven distance
    pub price_min: Option<u64>,
    pub price_max: Option<u64>,
    pub year_min: Option<u32>,
    pub year_max: Option<u32>,
    pub km_min: Option<u64>,
    pub km_max: Option<u64>,

    // Multi-select facets
    pub brand: BTreeSet<String>,
    pub models: BTreeMap<String, BTreeSet<String>>, // brand -> model sub-selection
    pub fuel: BTreeSet<String>,
    pub body: BTreeSet<String>,
    pub transmission: BTreeSet<String>,
    pub color: BTreeSet<String>,

    pub ordering: SortOrder,
    pub page: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            price_min: None,
            price_max: None,
            year_min: None,
            year_max: None,
            km_min: None,
            km_max: None,
            brand: BTreeSet::new(),
            models: BTreeMap::new(),
            fuel: BTreeSet::new(),
            body: BTreeSet::new(),
            transmission: BTreeSet::new(),
            color: BTreeSet::new(),
            ordering: SortOrder::default(),
            page: 1,
        }
    }
}

/// Partially decoded filter state, as produced from a query string.
///
/// Set fields are always present (possibly empty); an empty set leaves the
/// base state's selection untouched when merged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterPatch {
    pub search: Option<String>,
    pub price_min: Option<u64>,
    pub price_max: Option<u64>,
    pub year_min: Option<u32>,
    pub year_max: Option<u32>,
    pub km_min: Option<u64>,
    pub km_max: Option<u64>,
    pub brand: BTreeSet<String>,
    pub models: BTreeMap<String, BTreeSet<String>>,
    pub fuel: BTreeSet<String>,
    pub body: BTreeSet<String>,
    pub transmission: BTreeSet<String>,
    pub color: BTreeSet<String>,
    pub ordering: Option<SortOrder>,
    pub page: Option<u32>,
}

// Normalized car record returned by the inventory endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListingItem {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "make")]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_u32")]
    pub year: Option<u32>,
    #[serde(default, deserialize_with = "de_lenient_u64")]
    pub price: Option<u64>,
    #[serde(default, alias = "discounted_price", deserialize_with = "de_lenient_u64")]
    pub discount_price: Option<u64>,
    #[serde(default, alias = "km_driven", alias = "kilometers", deserialize_with = "de_lenient_u64")]
    pub km: Option<u64>,
    #[serde(default, alias = "fuel_type")]
    pub fuel: Option<String>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default, alias = "body_type")]
    pub body: Option<String>,
    #[serde(default, alias = "colour")]
    pub color: Option<String>,
    #[serde(default, alias = "location")]
    pub city: Option<String>,
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,

    // Only consumed by detail views, kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection: Option<serde_json::Value>,
}

impl ListingItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// One page of results as returned by `GET /api/cars/`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultPage {
    #[serde(rename = "results")]
    pub items: Vec<ListingItem>,
    #[serde(rename = "count", default)]
    pub total_count: u64,
    #[serde(rename = "next", default)]
    pub next_cursor: Option<String>,
}

impl ResultPage {
    // Some backends send "" instead of null on the last page
    pub fn normalized(mut self) -> Self {
        if self.next_cursor.as_deref().is_some_and(|c| c.trim().is_empty()) {
            self.next_cursor = None;
        }
        self
    }
}

// --- Lenient wire helpers ---
// The backend is not consistent about numbers vs numeric strings.

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Unsigned(u64),
    Float(f64),
    Text(String),
}

fn parse_numeric_text(text: &str) -> Option<u64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<u64>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

fn lenient_number(raw: Option<NumberOrText>) -> Option<u64> {
    match raw? {
        NumberOrText::Unsigned(n) => Some(n),
        NumberOrText::Float(f) if f.is_finite() && f >= 0.0 => Some(f.round() as u64),
        NumberOrText::Float(_) => None,
        NumberOrText::Text(text) => parse_numeric_text(&text),
    }
}

fn de_lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_number(Option::<NumberOrText>::deserialize(deserializer)?))
}

fn de_lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_number(Option::<NumberOrText>::deserialize(deserializer)?)
        .and_then(|n| u32::try_from(n).ok()))
}

fn de_lenient_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Signed(i64),
        Text(String),
    }
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Signed(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
