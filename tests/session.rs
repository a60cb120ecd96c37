mod common;

use car_catalog::{
    CatalogSession, Facet, FetchOrchestrator, FilterState, OrchestratorConfig, SortOrder,
    url_sync::{Location, MemoryLocation},
};
use common::{ScriptedSource, ids, page};
use pretty_assertions::assert_eq;

fn session_at(query: &str, source: &std::sync::Arc<ScriptedSource>) -> CatalogSession<MemoryLocation> {
    let orchestrator = FetchOrchestrator::new(source.clone(), OrchestratorConfig::default());
    CatalogSession::new(MemoryLocation::new(query), orchestrator)
}

#[tokio::test(start_paused = true)]
async fn deep_link_hydrates_and_fetches() {
    let source = ScriptedSource::new();
    source.respond(
        "price_min=500000&price_max=1000000&fuel=Petrol",
        0,
        Ok(page(&["city", "verna"], None)),
    );
    let mut session = session_at("?fuel=Petrol&price_max=1000000&price_min=500000", &source);

    let filters = session.start(FilterState::default()).await.clone();
    assert_eq!(filters.price_min, Some(500_000));
    assert_eq!(filters.price_max, Some(1_000_000));
    assert!(filters.fuel.contains("Petrol"));

    let listing = session.orchestrator().settled().await;
    assert_eq!(ids(&listing.items), ["city", "verna"]);
    // Hydration alone never writes the location
    assert_eq!(session.location().replacements(), 0);
}

#[tokio::test(start_paused = true)]
async fn edits_replace_the_current_history_entry() {
    let source = ScriptedSource::new();
    source.respond("fuel=Diesel", 0, Ok(page(&["xuv"], None)));
    source.respond("fuel=Diesel&ordering=price_asc", 0, Ok(page(&["nexon", "xuv"], None)));
    let mut session = session_at("", &source);
    session.start(FilterState::default()).await;

    assert!(session.update(|f| { f.toggle(Facet::Fuel, "Diesel"); }).await);
    assert!(session.update(|f| f.set_ordering(SortOrder::PriceAsc)).await);
    assert_eq!(session.location().query(), "fuel=Diesel&ordering=price_asc");
    assert_eq!(session.location().history_len(), 1);
    assert_eq!(session.location().replacements(), 2);

    let listing = session.orchestrator().settled().await;
    assert_eq!(ids(&listing.items), ["nexon", "xuv"]);
    // The initial load and both edits land inside one debounce window
    assert_eq!(source.calls(), vec!["fuel=Diesel&ordering=price_asc"]);
}

#[tokio::test(start_paused = true)]
async fn no_op_edit_changes_nothing() {
    let source = ScriptedSource::new();
    source.respond("brand=Honda", 0, Ok(page(&["city"], None)));
    let mut session = session_at("?brand=Honda", &source);
    session.start(FilterState::default()).await;
    session.orchestrator().settled().await;

    assert!(!session.update(|f| { f.toggle(Facet::Brand, "  "); }).await);
    assert!(!session.update(|f| f.set_search("   ")).await);
    assert_eq!(session.location().replacements(), 0);
    assert_eq!(source.calls(), vec!["brand=Honda"]);
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent() {
    let source = ScriptedSource::new();
    source.respond("brand=Kia", 0, Ok(page(&["seltos"], None)));
    let mut session = session_at("?brand=Kia", &source);

    session.start(FilterState::default()).await;
    session.orchestrator().settled().await;
    let again = session.start(FilterState::default()).await.clone();

    assert!(again.brand.contains("Kia"));
    assert_eq!(source.calls(), vec!["brand=Kia"]);
    assert_eq!(ids(&session.listing().items), ["seltos"]);
}
