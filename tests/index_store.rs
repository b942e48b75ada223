//! Index Store Integration Tests
//!
//! Tests for the on-disk layout, round-trips and namespace isolation.

use arrcoon::core::{IndexFile, IndexStore, Namespace};
use tempfile::TempDir;

fn hashes(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_round_trip_preserves_order() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::new(temp.path());
    let saved = hashes(&[
        "FFFFF4F4132C4AC7031F5692F36AC77A2ECBCCBB",
        "AAAAA4F4132C4AC7031F5692F36AC77A2ECBCCBB",
        "MMMMMMMMMMMMMMMMMMMMMMMMMMMMMMMM",
    ]);

    store.save(Namespace::Sonarr, "series_85", &saved).await.unwrap();

    assert_eq!(store.load(Namespace::Sonarr, "series_85").await, saved);
}

#[tokio::test]
async fn test_layout_is_namespace_then_key() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::new(temp.path());

    store
        .save(Namespace::Radarr, &Namespace::Radarr.key(12), &hashes(&["X"]))
        .await
        .unwrap();

    let path = temp.path().join(".index").join("radarr").join("movie_12.json");
    let content = std::fs::read_to_string(&path).unwrap();
    let file: IndexFile = serde_json::from_str(&content).unwrap();
    assert_eq!(file.hashes, hashes(&["X"]));
}

#[tokio::test]
async fn test_save_overwrites() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::new(temp.path());

    store.save(Namespace::Sonarr, "series_1", &hashes(&["A", "B"])).await.unwrap();
    store.save(Namespace::Sonarr, "series_1", &hashes(&["C"])).await.unwrap();

    assert_eq!(store.load(Namespace::Sonarr, "series_1").await, hashes(&["C"]));
}

#[tokio::test]
async fn test_drop_all_only_touches_its_namespace() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::new(temp.path());

    store.save(Namespace::Sonarr, "series_1", &hashes(&["A"])).await.unwrap();
    store.save(Namespace::Radarr, "movie_1", &hashes(&["B"])).await.unwrap();

    store.drop_all(Namespace::Sonarr).await.unwrap();

    assert!(store.load(Namespace::Sonarr, "series_1").await.is_empty());
    assert_eq!(store.load(Namespace::Radarr, "movie_1").await, hashes(&["B"]));

    // Dropping an already empty namespace is fine
    store.drop_all(Namespace::Sonarr).await.unwrap();
}

#[tokio::test]
async fn test_delete_then_load_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = IndexStore::new(temp.path());

    store.save(Namespace::Radarr, "movie_5", &hashes(&["A"])).await.unwrap();
    store.delete(Namespace::Radarr, "movie_5").await.unwrap();

    assert!(store.load(Namespace::Radarr, "movie_5").await.is_empty());
    assert!(!store.entry_path(Namespace::Radarr, "movie_5").exists());
}
