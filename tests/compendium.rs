//! Scenario 6 (compendium flow) against the public `Library` façade.

mod support;

use std::collections::HashMap;
use std::sync::Arc;

use athenaeum_core::{CompendiumOptions, Library, LibraryConfig, LibraryError, NullLogger, Stacks, TextGenerationProvider};

use support::{metadata, CannedGenerator, HashEmbedder};

fn library() -> Library {
    let stacks = Stacks::new(LibraryConfig::default(), Arc::new(NullLogger));
    Library::new(stacks, Arc::new(HashEmbedder::new(8)), LibraryConfig::default())
}

#[tokio::test]
async fn compendium_flow_stores_summary_and_drops_originals() {
    let mut lib = library();
    let v1 = lib.add("first source note".into(), HashMap::new(), None).await.unwrap();
    let v2 = lib.add("second source note".into(), HashMap::new(), None).await.unwrap();

    let generator: Arc<dyn TextGenerationProvider> = Arc::new(CannedGenerator::new("SUM"));
    lib.set_text_generator(&generator);

    let summary_id = lib
        .compendium(CompendiumOptions {
            ids: vec![v1.clone(), v2.clone()],
            delete_originals: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let volumes = lib.stacks().get_all();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].id, summary_id);
    assert_eq!(volumes[0].text, "SUM");
    assert_eq!(
        volumes[0].metadata.get("summarizedFrom").unwrap(),
        &format!("{v1},{v2}")
    );
}

#[tokio::test]
async fn compendium_requires_at_least_two_ids() {
    let mut lib = library();
    let v1 = lib.add("only one".into(), metadata(&[("topic", "misc")]), None).await.unwrap();
    let generator: Arc<dyn TextGenerationProvider> = Arc::new(CannedGenerator::new("SUM"));
    lib.set_text_generator(&generator);

    let err = lib
        .compendium(CompendiumOptions {
            ids: vec![v1],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::SummarizeTooFew(1)));
}

#[tokio::test]
async fn compendium_without_generator_fails_clearly() {
    let mut lib = library();
    let v1 = lib.add("a".into(), HashMap::new(), None).await.unwrap();
    let v2 = lib.add("b".into(), HashMap::new(), None).await.unwrap();

    let err = lib
        .compendium(CompendiumOptions {
            ids: vec![v1, v2],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NoTextGenerator));
}
