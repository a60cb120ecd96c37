use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::{fs::File, io, path::PathBuf, sync::Arc};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use car_catalog::{
    CatalogSession, FetchOrchestrator, FilterState, HttpInventory, InventorySource, ListingItem,
    LocalCatalog, OrchestratorConfig,
    config::Settings,
    export, inventory,
    models::{Facet, RangeKind},
    query_codec,
    url_sync::MemoryLocation,
    vocabulary::FacetVocabulary,
};

#[derive(Parser, Debug)]
#[command(name = "car-catalog", version, about = "Browse a used-car inventory with faceted filters")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch listings for a filter query string (e.g. "brand=Honda&price_max=800000")
    Browse {
        #[arg(default_value = "")]
        query: String,
        /// Number of pages to load, following the server cursor
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Filter a local JSON dump in memory instead of calling the endpoint
        #[arg(long)]
        local: Option<PathBuf>,
        /// Write the listings to a CSV file instead of printing them
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print the facet vocabulary
    Facets,
    /// Decode a query string and print its canonical encoding
    Normalize { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "car_catalog=info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let settings = match Settings::new() {
        Ok(s) => {
            tracing::debug!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let vocabulary = settings.vocabulary()?;

    match cli.command {
        Command::Browse {
            query,
            pages,
            local,
            csv,
        } => browse(&settings, vocabulary, &query, pages, local, csv).await,
        Command::Facets => {
            print_vocabulary(&vocabulary);
            Ok(())
        }
        Command::Normalize { query } => {
            let filters = FilterState::default().apply_patch(query_codec::decode(&query));
            println!("{}", query_codec::encode(&filters));
            Ok(())
        }
    }
}

async fn browse(
    settings: &Settings,
    vocabulary: FacetVocabulary,
    query: &str,
    pages: usize,
    local: Option<PathBuf>,
    csv: Option<PathBuf>,
) -> Result<()> {
    let source: Arc<dyn InventorySource> = match local {
        Some(path) => Arc::new(LocalCatalog::from_json_file(&path, vocabulary, settings.page_size)?),
        None => {
            let client = inventory::build_client(settings)?;
            Arc::new(HttpInventory::new(client, settings)?)
        }
    };

    let orchestrator = FetchOrchestrator::new(source, OrchestratorConfig::from(settings));
    let mut session = CatalogSession::new(MemoryLocation::new(query), orchestrator.clone());
    let filters = session.start(FilterState::default()).await;
    tracing::info!(query = %query_codec::encode(filters), "starting browse");

    // Nothing else will edit the filters, skip the debounce window
    orchestrator.flush().await;
    let mut listing = orchestrator.settled().await;
    for _ in 1..pages.max(1) {
        if !orchestrator.load_more().await {
            break;
        }
        listing = orchestrator.settled().await;
    }

    if let Some(error) = &listing.error {
        tracing::error!(error = %error, "browse ended with a fetch error");
        if listing.items.is_empty() {
            return Err(anyhow!("Failed to fetch listings: {error}"));
        }
    }
    tracing::info!(
        shown = listing.items.len(),
        total = listing.total_count,
        has_more = listing.has_more,
        "browse complete"
    );

    match csv {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            export::write_csv(&listing.items, file)?;
            tracing::info!(path = %path.display(), "listings written as CSV");
        }
        None => {
            for item in &listing.items {
                println!("{}", describe(item));
            }
        }
    }
    Ok(())
}

fn describe(item: &ListingItem) -> String {
    let title = item.title.clone().unwrap_or_else(|| {
        [item.brand.as_deref(), item.model.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    });
    let price = item
        .discount_price
        .or(item.price)
        .map_or("-".to_string(), |p| p.to_string());
    let km = item.km.map_or("-".to_string(), |km| format!("{km} km"));
    let city = item.city.as_deref().unwrap_or("-");
    format!("{:>8}  {:<40} {:>10}  {:>10}  {}", item.id, title, price, km, city)
}

fn print_vocabulary(vocabulary: &FacetVocabulary) {
    for facet in Facet::ALL {
        println!("{}: {}", facet.key(), vocabulary.values(facet).join(", "));
    }
    for brand in &vocabulary.brands {
        println!("  {} -> {}", brand.name, brand.models.join(", "));
    }
    for (name, kind) in [("price", RangeKind::Price), ("year", RangeKind::Year), ("km", RangeKind::Km)] {
        let range = vocabulary.range(kind);
        let buckets: Vec<&str> = range.buckets.iter().map(|b| b.label.as_str()).collect();
        println!("{name}: {:?}..{:?} [{}]", range.floor, range.ceiling, buckets.join(" | "));
    }
}
