//! Save -> reload round trip against the public `Stacks` API (the
//! "round-trip laws" in SPEC_FULL.md §8: identical size, identical
//! volumes, identical search results for a fixed query).

use std::collections::HashMap;
use std::sync::Arc;

use athenaeum_core::{LibraryConfig, NullLogger, Stacks};

#[tokio::test]
async fn save_then_reload_preserves_volumes_and_search_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.json");

    let mut config = LibraryConfig::default();
    config.autosave_debounce_ms = 0;

    {
        let mut store = Stacks::new(config.clone(), Arc::new(NullLogger));
        store.load(&path).await.unwrap();
        store.add("first note".into(), vec![0.9, 0.1], HashMap::new(), 0).unwrap();
        store.add("second note".into(), vec![0.1, 0.9], HashMap::new(), 1).unwrap();
        store.dispose().await.unwrap();
    }

    let mut reloaded = Stacks::new(config, Arc::new(NullLogger));
    reloaded.load(&path).await.unwrap();

    assert_eq!(reloaded.len(), 2);
    let query = [0.85, 0.15];
    let results = reloaded.search(&query, 10, 0.0, 2000);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].volume.text, "first note");
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn loading_a_missing_path_starts_empty_and_remembers_it_for_autosave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist-yet.json");

    let mut store = Stacks::new(LibraryConfig::default(), Arc::new(NullLogger));
    store.load(&path).await.unwrap();
    assert_eq!(store.len(), 0);

    store.add("first note".into(), vec![1.0, 0.0], HashMap::new(), 0).unwrap();
    store.dispose().await.unwrap();

    assert!(tokio::fs::try_exists(&path).await.unwrap());
}
