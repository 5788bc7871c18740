//! Black-box end-to-end scenarios against the public `Stacks` API.

use std::collections::HashMap;
use std::sync::Arc;

use athenaeum_core::{
    AdvancedSearchOptions, LibraryConfig, NullLogger, Stacks, TextMatchMode, TextSearchOptions,
};

fn stacks() -> Stacks {
    Stacks::new(LibraryConfig::default(), Arc::new(NullLogger))
}

#[test]
fn vector_search_ordering() {
    let mut store = stacks();
    let a = store.add("volume a".into(), vec![0.9, 0.1, 0.0, 0.05], HashMap::new(), 0).unwrap();
    let b = store.add("volume b".into(), vec![0.1, 0.9, 0.0, 0.1], HashMap::new(), 1).unwrap();
    store.add("volume c".into(), vec![0.0, 0.1, 0.9, 0.0], HashMap::new(), 2).unwrap();

    let results = store.search(&[0.85, 0.15, 0.0, 0.05], 2, 0.1, 1000);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].volume.id, a);
    assert_eq!(results[1].volume.id, b);
    assert!(results[0].score >= 0.99 && results[0].score <= 1.0, "got {}", results[0].score);
    assert!(results[1].score >= 0.2 && results[1].score <= 0.4, "got {}", results[1].score);
    assert!(results[0].score >= results[1].score);
}

#[test]
fn dedup_greedy_clustering() {
    let mut store = stacks();
    let a = store.add("a".into(), vec![0.9, 0.1, 0.0, 0.05], HashMap::new(), 0).unwrap();
    let a_prime = store
        .add("a prime".into(), vec![0.901, 0.101, 0.001, 0.051], HashMap::new(), 1)
        .unwrap();
    store.add("b".into(), vec![0.0, 0.1, 0.9, 0.0], HashMap::new(), 2).unwrap();

    let groups = store.find_duplicates(0.9);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].representative, a);
    assert_eq!(groups[0].duplicates, vec![a_prime]);
}

#[test]
fn topic_merge_preserves_co_occurrence() {
    let mut store = stacks();
    let mut meta1 = HashMap::new();
    meta1.insert("topics".to_string(), "[\"java\",\"backend\"]".to_string());
    store.add("java backend note".into(), vec![1.0, 0.0], meta1, 0).unwrap();

    let mut meta2 = HashMap::new();
    meta2.insert("topics".to_string(), "[\"java\",\"database\"]".to_string());
    store.add("java database note".into(), vec![0.0, 1.0], meta2, 1).unwrap();

    store.merge_topic("java", "jvm");

    let related: HashMap<String, u64> = store.get_related_topics("jvm").into_iter().collect();
    assert_eq!(related.get("backend"), Some(&1));
    assert_eq!(related.get("database"), Some(&1));
    assert!(store.filter_by_topic("java").is_empty());
}

#[test]
fn bm25_advanced_search_finds_only_matching_volume() {
    let mut store = stacks();
    store.add("we run kubernetes in production".into(), vec![1.0, 0.0], HashMap::new(), 0).unwrap();
    store.add("the weather today is sunny".into(), vec![0.0, 1.0], HashMap::new(), 1).unwrap();
    store.add("coffee is best brewed slowly".into(), vec![1.0, 1.0], HashMap::new(), 2).unwrap();

    let options = AdvancedSearchOptions {
        text: Some(TextSearchOptions {
            query: "kubernetes".to_string(),
            mode: TextMatchMode::Bm25,
            threshold: 0.0,
            max_results: 10,
        }),
        max_results: 10,
        ..Default::default()
    };

    let results = store.advanced_search(&options, 1000);

    assert_eq!(results.len(), 1);
    assert!(results[0].volume.text.contains("kubernetes"));
}

#[test]
fn learning_drift_adapts_topic_weights_but_not_untouched_topics() {
    let mut store = stacks();
    let v1 = store.add("a science fact".into(), vec![1.0, 0.0], HashMap::new(), 0).unwrap();

    let baseline = store.adapted_weights(Some("science"));
    assert_eq!(baseline, store.adapted_weights(Some("art")));

    for i in 0..15 {
        let _ = store.advanced_search(
            &AdvancedSearchOptions {
                query_embedding: Some(vec![1.0, 0.0]),
                topic_filter: Some("science".to_string()),
                max_results: 10,
                ..Default::default()
            },
            i,
        );
    }
    let _ = &v1;

    let science_weights = store.adapted_weights(Some("science"));
    let art_weights = store.adapted_weights(Some("art"));

    assert_eq!(art_weights, baseline, "untouched topic must keep the global default");
    assert_ne!(
        science_weights, baseline,
        "a topic with >= 10 queries must diverge from the global default along some axis"
    );
}
