use mindgap::{
    config::Config,
    processing::{EngineError, ExtractionError, RetrievalApi, RetrievalEngine},
};
use std::path::Path;
use tempfile::TempDir;

fn small_window_config() -> Config {
    Config {
        chunk_size: 4,
        chunk_overlap: 1,
        embedding_dimension: 64,
        ..Config::default()
    }
}

async fn local_engine() -> RetrievalEngine {
    let engine = RetrievalEngine::from_config(&small_window_config())
        .await
        .expect("engine");
    assert_eq!(engine.backend_name(), "local");
    engine
}

#[tokio::test]
async fn text_file_round_trips_through_local_backend() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "A B C D E F G H").expect("write");

    let engine = local_engine().await;
    let added = engine.ingest(&path, "").await.expect("ingest");
    assert_eq!(added, 3);
    assert_eq!(engine.indexed_entries().await.expect("count"), 3);

    let results = engine.search("D E F G", 3).await.expect("search");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0], "D E F G");

    let snapshot = engine.metrics_snapshot();
    assert_eq!(snapshot.documents_ingested, 1);
    assert_eq!(snapshot.chunks_ingested, 3);
    assert_eq!(snapshot.searches_served, 1);
}

#[tokio::test]
async fn markdown_and_ocr_text_are_searchable_together() {
    let dir = TempDir::new().expect("tempdir");
    let notes = dir.path().join("Chapter.MD");
    std::fs::write(&notes, "chlorophyll absorbs light energy").expect("write");

    let engine = local_engine().await;
    engine.ingest(&notes, "").await.expect("markdown");
    engine
        .ingest(Path::new("whiteboard.jpeg"), "mitochondria make ATP")
        .await
        .expect("image");

    let results = engine.search("mitochondria make ATP", 1).await.expect("search");
    assert_eq!(results, vec!["mitochondria make ATP"]);
}

#[tokio::test]
async fn unsupported_document_leaves_index_empty() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("essay.docx");
    std::fs::write(&path, "binary-ish").expect("write");

    let engine = local_engine().await;
    let error = engine.ingest(&path, "").await.unwrap_err();
    assert!(matches!(
        error,
        EngineError::Extraction(ExtractionError::UnsupportedFormat { .. })
    ));
    assert!(error.is_client_error());
    assert_eq!(engine.indexed_entries().await.expect("count"), 0);
    assert!(engine.search("anything", 3).await.expect("search").is_empty());
}

#[tokio::test]
async fn context_is_available_through_the_shared_trait() {
    let engine = local_engine().await;
    engine
        .ingest_text("A B C D E F G H", Some("inline"))
        .await
        .expect("ingest");

    let api: &dyn RetrievalApi = &engine;
    let context = api.context("G H", 2).await.expect("context");
    assert_eq!(context.lines().next(), Some("G H"));
    assert_eq!(context.lines().count(), 2);
}

#[tokio::test]
async fn overlap_not_smaller_than_size_is_rejected() {
    let config = Config {
        chunk_size: 100,
        chunk_overlap: 150,
        ..small_window_config()
    };
    let engine = RetrievalEngine::from_config(&config).await.expect("engine");
    let error = engine.ingest_text("some words", None).await.unwrap_err();
    assert!(matches!(error, EngineError::Chunking(_)));
}
