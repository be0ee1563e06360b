mod common;

use common::*;
use lapps_chains::directory::{metadata_key, services_key};
use lapps_chains::{DirectoryCache, MemoryCache, MetadataCache, ServiceDirectory, ServiceFilter};
use serde_json::json;
use std::sync::Arc;

const TOKENIZER: &str = "brandeis_eldrad_grid_1:stanfordnlp.tokenizer_2.0.4";
const TAGGER: &str = "brandeis_eldrad_grid_1:stanfordnlp.postagger_2.0.4";
const GATE: &str = "anc:gate.tokenizer_2.2.0";
const OPENNLP: &str = "anc:opennlp.tokenizer_pipeline_1.0.0";
const GOST: &str = "anc:gost.tokenizer_1.0.0";

fn mock_servers() -> MockRemoteService {
    MockRemoteService::new()
        .with_listing(BRANDEIS, vec![service_record(TOKENIZER), service_record(TAGGER)])
        .with_listing(
            VASSAR,
            vec![
                service_record(GATE),
                service_record(OPENNLP),
                service_record(GOST),
                json!({ "serviceName": "no id" }),
            ],
        )
        .with_metadata(TOKENIZER, producing(&["http://vocab.lappsgrid.org/Token"]))
        .with_metadata(
            TAGGER,
            producing(&[
                "http://vocab.lappsgrid.org/Token#pos",
                "http://vocab.lappsgrid.org/Token",
            ]),
        )
        .with_metadata(GATE, producing(&["http://vocab.lappsgrid.org/Token"]))
}

fn both_servers() -> Vec<String> {
    vec![BRANDEIS.to_string(), VASSAR.to_string()]
}

#[tokio::test]
async fn test_load_filters_vassar_services() -> Result<()> {
    init_tracing();

    let remote = Arc::new(mock_servers());
    let cache = Arc::new(MemoryCache::new());
    let directory = ServiceDirectory::load(
        &both_servers(),
        remote.clone(),
        cache.clone(),
        vec![ServiceFilter::vassar_exclusions()],
    )
    .await?;

    assert_eq!(directory.len(), 3);
    assert!(directory.lookup(GATE).is_some());
    assert!(directory.lookup(OPENNLP).is_none());
    assert!(directory.lookup(GOST).is_none());

    let vassar: Vec<&str> = directory
        .list_all(VASSAR)
        .iter()
        .map(|s| s.identifier.as_str())
        .collect();
    assert_eq!(vassar, vec![GATE]);
    assert_eq!(directory.list_all(BRANDEIS).len(), 2);

    // Listings are cached unfiltered.
    let cached = cache.get(&services_key(VASSAR)).unwrap();
    assert_eq!(cached.as_array().unwrap().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_filter_only_applies_to_its_server() {
    let filter = ServiceFilter::vassar_exclusions();

    assert!(filter.excludes(VASSAR, OPENNLP));
    assert!(filter.excludes(VASSAR, GOST));
    assert!(!filter.excludes(VASSAR, GATE));
    assert!(!filter.excludes(BRANDEIS, "brandeis_eldrad_grid_1:opennlp.splitter_1.0.0"));
}

#[tokio::test]
async fn test_cached_listing_skips_remote() -> Result<()> {
    let remote = Arc::new(mock_servers());
    let cache = Arc::new(MemoryCache::new());
    cache.put(&services_key(BRANDEIS), &json!([service_record(TOKENIZER)]))?;

    let directory = ServiceDirectory::load(
        &[BRANDEIS.to_string()],
        remote.clone(),
        cache.clone(),
        Vec::new(),
    )
    .await?;

    assert_eq!(remote.listing_calls(), 0);
    assert_eq!(directory.len(), 1);
    assert_eq!(directory.lookup(TOKENIZER).unwrap().server, BRANDEIS);
    Ok(())
}

#[tokio::test]
async fn test_unknown_server_listing_fails() {
    let remote = Arc::new(mock_servers());
    let cache = Arc::new(MemoryCache::new());

    let result = ServiceDirectory::load(&["nowhere".to_string()], remote, cache, Vec::new()).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_metadata_is_cached() -> Result<()> {
    let remote = Arc::new(mock_servers());
    let cache = Arc::new(MemoryCache::new());
    let directory =
        ServiceDirectory::load(&both_servers(), remote.clone(), cache.clone(), Vec::new()).await?;
    let tokenizer = ServiceDescriptor::new(BRANDEIS, TOKENIZER);

    let first = directory.metadata(&tokenizer, false).await.unwrap();
    let second = directory.metadata(&tokenizer, false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(remote.metadata_calls(), 1);
    assert_eq!(cache.get(&metadata_key(TOKENIZER)), Some(first));
    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_falls_back_to_cache() -> Result<()> {
    init_tracing();

    let remote = Arc::new(mock_servers());
    let cache = Arc::new(MemoryCache::new());
    let stale = producing(&["http://vocab.lappsgrid.org/Sentence"]);
    cache.put(&metadata_key(OPENNLP), &stale)?;
    let directory =
        ServiceDirectory::load(&both_servers(), remote.clone(), cache.clone(), Vec::new()).await?;
    let opennlp = ServiceDescriptor::new(VASSAR, OPENNLP);

    let metadata = directory.metadata(&opennlp, true).await.unwrap();

    assert_eq!(metadata, stale);
    assert_eq!(remote.metadata_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_metadata_error_without_cache() -> Result<()> {
    let remote = Arc::new(mock_servers());
    let cache = Arc::new(MemoryCache::new());
    let directory =
        ServiceDirectory::load(&both_servers(), remote.clone(), cache, Vec::new()).await?;

    let error = directory
        .metadata(&ServiceDescriptor::new(VASSAR, GOST), false)
        .await
        .unwrap_err();

    assert_eq!(error.identifier, GOST);
    assert!(matches!(error.cause, RemoteFailure::Status { status: 503, .. }));
    Ok(())
}

#[tokio::test]
async fn test_categorize_on_produced_types() -> Result<()> {
    init_tracing();

    let remote = Arc::new(mock_servers());
    let cache = Arc::new(MemoryCache::new());
    let mut directory = ServiceDirectory::load(
        &both_servers(),
        remote.clone(),
        cache,
        vec![ServiceFilter::vassar_exclusions()],
    )
    .await?;

    assert_eq!(directory.load_all_metadata().await, 3);
    // Everything already has metadata now.
    assert_eq!(directory.load_all_metadata().await, 0);

    let categories = directory.categorize();
    assert_eq!(categories.len(), 2);

    let token = vec!["http://vocab.lappsgrid.org/Token".to_string()];
    let producers: Vec<&str> = categories[&token]
        .iter()
        .map(|s| s.identifier.as_str())
        .collect();
    assert_eq!(producers, vec![TOKENIZER, GATE]);

    let pos = vec![
        "http://vocab.lappsgrid.org/Token".to_string(),
        "http://vocab.lappsgrid.org/Token#pos".to_string(),
    ];
    assert_eq!(categories[&pos][0].identifier, TAGGER);

    let listing = directory.categorized_listing();
    assert!(listing.contains(&format!(
        "http://vocab.lappsgrid.org/Token\n    {}\n    {}\n",
        GATE, TOKENIZER
    )));
    Ok(())
}

#[tokio::test]
async fn test_services_without_metadata_are_uncategorized() -> Result<()> {
    let remote = Arc::new(MockRemoteService::new().with_listing(VASSAR, vec![service_record(GOST)]));
    let cache = Arc::new(MemoryCache::new());
    let mut directory =
        ServiceDirectory::load(&[VASSAR.to_string()], remote, cache, Vec::new()).await?;

    assert_eq!(directory.load_all_metadata().await, 0);

    let listing = directory.categorized_listing();
    assert_eq!(listing, format!("\nNone\n    {}\n\n", GOST));
    Ok(())
}

struct ReadOnlyCache;

impl MetadataCache for ReadOnlyCache {
    fn get(&self, _key: &str) -> Option<serde_json::Value> {
        None
    }

    fn put(&self, _key: &str, _value: &serde_json::Value) -> Result<()> {
        Err(LappsError::General("read-only cache".to_string()))
    }
}

#[tokio::test]
async fn test_listing_survives_cache_write_failure() -> Result<()> {
    init_tracing();

    let remote = Arc::new(mock_servers());
    let directory = ServiceDirectory::load(
        &both_servers(),
        remote.clone(),
        Arc::new(ReadOnlyCache),
        vec![ServiceFilter::vassar_exclusions()],
    )
    .await?;

    assert_eq!(remote.listing_calls(), 2);
    assert_eq!(directory.len(), 3);
    assert!(directory.lookup(TOKENIZER).is_some());
    Ok(())
}

#[test]
fn test_directory_cache_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = DirectoryCache::new(dir.path());
    let metadata = producing(&["http://vocab.lappsgrid.org/Token"]);

    assert!(cache.get(&metadata_key(GATE)).is_none());
    cache.put(&metadata_key(GATE), &metadata)?;

    assert_eq!(cache.get(&metadata_key(GATE)), Some(metadata));
    assert!(dir.path().join("metadata").join(format!("{}.json", GATE)).exists());
    Ok(())
}

#[test]
fn test_directory_cache_ignores_corrupt_entries() -> Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("services"))?;
    std::fs::write(dir.path().join("services").join("vassar.json"), "{ not json")?;
    let cache = DirectoryCache::new(dir.path());

    assert!(cache.get(&services_key(VASSAR)).is_none());
    Ok(())
}
