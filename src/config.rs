// Loading configuration
// Uses the 'config' crate layered over optional 'catalog.toml' and CATALOG_* env vars

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::{path::Path, time::Duration};

use crate::scroll::DEFAULT_LOOK_AHEAD_PX;
use crate::vocabulary::FacetVocabulary;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_LISTING_PATH: &str = "/api/cars/";
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_PAGE_SIZE: usize = 20;
const DEFAULT_RESPONSE_CACHE_CAPACITY: usize = 32;
const DEFAULT_RESPONSE_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub listing_path: String,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub look_ahead_px: u32,
    // Page size used by the in-memory catalog
    pub page_size: usize,
    // 0 in either cache setting disables the response cache
    pub response_cache_capacity: usize,
    pub response_cache_ttl_secs: u64,
    pub vocabulary_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            look_ahead_px: DEFAULT_LOOK_AHEAD_PX,
            page_size: DEFAULT_PAGE_SIZE,
            response_cache_capacity: DEFAULT_RESPONSE_CACHE_CAPACITY,
            response_cache_ttl_secs: DEFAULT_RESPONSE_CACHE_TTL_SECS,
            vocabulary_path: None,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present
        Self::from_file("catalog")
    }

    // `name` is resolved like config::File::with_name (extension optional, file optional)
    pub fn from_file(name: &str) -> Result<Self> {
        let builder = Config::builder()
            // Add default values
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("listing_path", DEFAULT_LISTING_PATH)?
            .set_default("debounce_ms", DEFAULT_DEBOUNCE_MS as i64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("look_ahead_px", i64::from(DEFAULT_LOOK_AHEAD_PX))?
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("response_cache_capacity", DEFAULT_RESPONSE_CACHE_CAPACITY as i64)?
            .set_default("response_cache_ttl_secs", DEFAULT_RESPONSE_CACHE_TTL_SECS as i64)?
            .add_source(File::with_name(name).required(false))
            // e.g. CATALOG_API_BASE_URL, CATALOG_DEBOUNCE_MS
            .add_source(Environment::with_prefix("CATALOG").try_parsing(true));

        let settings = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        Ok(settings)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn vocabulary(&self) -> Result<FacetVocabulary> {
        match &self.vocabulary_path {
            Some(path) => FacetVocabulary::load(Path::new(path)),
            None => Ok(FacetVocabulary::builtin().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "api_base_url = \"https://cars.example.com\"\ndebounce_ms = 150\npage_size = 12"
        )
        .unwrap();

        let settings = Settings::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.api_base_url, "https://cars.example.com");
        assert_eq!(settings.debounce(), Duration::from_millis(150));
        assert_eq!(settings.page_size, 12);
        assert_eq!(settings.listing_path, DEFAULT_LISTING_PATH);
        assert_eq!(settings.request_timeout(), Duration::from_secs(20));
        assert!(settings.vocabulary_path.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::from_file("/nonexistent/catalog-settings").unwrap();
        assert_eq!(settings.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(settings.look_ahead_px, DEFAULT_LOOK_AHEAD_PX);
        assert_eq!(settings.response_cache_ttl_secs, DEFAULT_RESPONSE_CACHE_TTL_SECS);
    }

    #[test]
    fn builtin_vocabulary_without_path() {
        let vocabulary = Settings::default().vocabulary().unwrap();
        assert_eq!(&vocabulary, FacetVocabulary::builtin());
    }
}
