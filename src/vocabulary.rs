// Static facet vocabulary: brand -> model map, enumerations and range presets.
// Not derived from the dataset; a TOML file may replace the built-in set.

use anyhow::{Context, Result};
use config::{Config, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::{Facet, RangeKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandModels {
    pub name: String,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

/// Default slider bounds and presets for one numeric facet.
///
/// A filter bound equal to `floor` / `ceiling` is the UI's "unbounded"
/// sentinel and is not applied by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RangeFacet {
    #[serde(default)]
    pub floor: Option<u64>,
    #[serde(default)]
    pub ceiling: Option<u64>,
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

impl RangeFacet {
    /// Drop bounds that sit on the configured sentinel values.
    pub fn effective(&self, min: Option<u64>, max: Option<u64>) -> (Option<u64>, Option<u64>) {
        let min = min.filter(|v| self.floor != Some(*v));
        let max = max.filter(|v| self.ceiling != Some(*v));
        (min, max)
    }

    pub fn bucket(&self, label: &str) -> Option<&Bucket> {
        self.buckets
            .iter()
            .find(|b| b.label.eq_ignore_ascii_case(label.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacetVocabulary {
    #[serde(default)]
    pub brands: Vec<BrandModels>,
    #[serde(default)]
    pub fuels: Vec<String>,
    #[serde(default)]
    pub bodies: Vec<String>,
    #[serde(default)]
    pub transmissions: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub price: RangeFacet,
    #[serde(default)]
    pub year: RangeFacet,
    #[serde(default)]
    pub km: RangeFacet,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn bucket(label: &str, min: Option<u64>, max: Option<u64>) -> Bucket {
    Bucket {
        label: label.to_string(),
        min,
        max,
    }
}

static BUILTIN: Lazy<FacetVocabulary> = Lazy::new(|| {
    let brands = [
        ("Honda", &["Amaze", "City", "Jazz", "WR-V"][..]),
        ("Hyundai", &["Creta", "i10", "i20", "Venue", "Verna"][..]),
        ("Kia", &["Carens", "Seltos", "Sonet"][..]),
        ("Mahindra", &["Scorpio", "Thar", "XUV300", "XUV700"][..]),
        ("Maruti Suzuki", &["Baleno", "Brezza", "Dzire", "Ertiga", "Swift"][..]),
        ("Tata", &["Altroz", "Harrier", "Nexon", "Punch", "Tiago"][..]),
        ("Toyota", &["Fortuner", "Glanza", "Innova", "Urban Cruiser"][..]),
        ("Volkswagen", &["Polo", "Taigun", "Virtus"][..]),
    ]
    .into_iter()
    .map(|(name, models)| BrandModels {
        name: name.to_string(),
        models: strings(models),
    })
    .collect();

    FacetVocabulary {
        brands,
        fuels: strings(&["Petrol", "Diesel", "CNG", "Electric", "Hybrid"]),
        bodies: strings(&["Hatchback", "Sedan", "SUV", "MUV", "Compact SUV"]),
        transmissions: strings(&["Manual", "Automatic"]),
        colors: strings(&["White", "Silver", "Grey", "Black", "Red", "Blue", "Brown"]),
        price: RangeFacet {
            floor: Some(0),
            ceiling: Some(5_000_000),
            buckets: vec![
                bucket("Under 3 Lakh", None, Some(300_000)),
                bucket("3 - 5 Lakh", Some(300_000), Some(500_000)),
                bucket("5 - 10 Lakh", Some(500_000), Some(1_000_000)),
                bucket("Above 10 Lakh", Some(1_000_000), None),
            ],
        },
        year: RangeFacet {
            floor: Some(2000),
            ceiling: Some(2025),
            buckets: vec![
                bucket("2020 & above", Some(2020), None),
                bucket("2016 - 2019", Some(2016), Some(2019)),
                bucket("Before 2016", None, Some(2015)),
            ],
        },
        km: RangeFacet {
            floor: Some(0),
            ceiling: Some(200_000),
            buckets: vec![
                bucket("Under 25,000 km", None, Some(25_000)),
                bucket("Under 50,000 km", None, Some(50_000)),
                bucket("Under 75,000 km", None, Some(75_000)),
                bucket("Under 1,00,000 km", None, Some(100_000)),
            ],
        },
    }
});

impl FacetVocabulary {
    pub fn builtin() -> &'static FacetVocabulary {
        &BUILTIN
    }

    // Loads a vocabulary file (format picked from the extension, e.g. .toml)
    pub fn load(path: &Path) -> Result<Self> {
        let vocabulary = Config::builder()
            .add_source(File::from(path))
            .build()
            .with_context(|| format!("Failed to read facet vocabulary {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse facet vocabulary {}", path.display()))?;
        Ok(vocabulary)
    }

    pub fn range(&self, kind: RangeKind) -> &RangeFacet {
        match kind {
            RangeKind::Price => &self.price,
            RangeKind::Year => &self.year,
            RangeKind::Km => &self.km,
        }
    }

    /// Enumerated values for a multi-select facet.
    pub fn values(&self, facet: Facet) -> Vec<&str> {
        match facet {
            Facet::Brand => self.brands.iter().map(|b| b.name.as_str()).collect(),
            Facet::Fuel => self.fuels.iter().map(String::as_str).collect(),
            Facet::Body => self.bodies.iter().map(String::as_str).collect(),
            Facet::Transmission => self.transmissions.iter().map(String::as_str).collect(),
            Facet::Color => self.colors.iter().map(String::as_str).collect(),
        }
    }

    pub fn models_for(&self, brand: &str) -> &[String] {
        let brand = brand.trim();
        self.brands
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(brand))
            .map(|b| b.models.as_slice())
            .unwrap_or(&[])
    }
}
