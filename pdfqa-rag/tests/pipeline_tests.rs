//! Ingestion and retrieval behaviour of the RAG pipeline.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::MockEmbeddingProvider;
use pdfqa_rag::{
    Document, EmbeddingProvider, InMemoryVectorStore, RagConfig, RagError, RagPipeline, VectorStore,
};

const COLLECTION: &str = "documents";

fn pipeline_with(
    provider: MockEmbeddingProvider,
    store: Arc<InMemoryVectorStore>,
    config: RagConfig,
) -> RagPipeline {
    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(provider))
        .vector_store(store)
        .build()
        .unwrap()
}

fn small_config() -> RagConfig {
    RagConfig::builder().chunk_size(40).chunk_overlap(10).top_k(4).build().unwrap()
}

fn sample_documents() -> Vec<Document> {
    (1..=5)
        .map(|i| {
            Document::new(
                format!("doc{i}"),
                format!("doc{i}.pdf"),
                format!("Document number {i} talks about topic {i}. ").repeat(4),
            )
        })
        .collect()
}

#[tokio::test]
async fn reingesting_is_idempotent() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(MockEmbeddingProvider::new(16), store.clone(), small_config());
    let documents = sample_documents();

    let first = pipeline.ingest_batch(COLLECTION, &documents).await.unwrap();
    let count_after_first = store.count(COLLECTION).await.unwrap();
    let results_first = pipeline.query(COLLECTION, "topic 3").await.unwrap();

    let second = pipeline.ingest_batch(COLLECTION, &documents).await.unwrap();
    assert_eq!(first.chunk_count(), second.chunk_count());
    assert_eq!(store.count(COLLECTION).await.unwrap(), count_after_first);
    assert_eq!(pipeline.query(COLLECTION, "topic 3").await.unwrap(), results_first);
}

#[tokio::test]
async fn top_k_larger_than_index_returns_everything() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(MockEmbeddingProvider::new(8), store.clone(), small_config());
    let doc = Document::new("short", "short.pdf", "only a few words here");
    pipeline.ingest(COLLECTION, &doc).await.unwrap();

    let results = pipeline.query_top_k(COLLECTION, "words", 50).await.unwrap();
    assert_eq!(results.len(), store.count(COLLECTION).await.unwrap());
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn empty_index_returns_no_results() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(MockEmbeddingProvider::new(8), store.clone(), small_config());

    assert!(pipeline.query(COLLECTION, "anything").await.unwrap().is_empty());

    pipeline.create_collection(COLLECTION).await.unwrap();
    assert!(pipeline.query(COLLECTION, "anything").await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_top_k_is_a_config_error() {
    let pipeline =
        pipeline_with(MockEmbeddingProvider::new(8), Arc::new(InMemoryVectorStore::new()), small_config());
    let err = pipeline.query_top_k(COLLECTION, "q", 0).await.unwrap_err();
    assert!(matches!(err, RagError::Config(_)));
}

#[tokio::test]
async fn failed_document_is_isolated_and_leaves_no_chunks() {
    let store = Arc::new(InMemoryVectorStore::new());
    let mut documents = sample_documents();
    // The failure hits the second chunk, after the first one embedded fine.
    documents[2].text = format!("{} UNREACHABLE trailing text", "x".repeat(45));

    let provider = MockEmbeddingProvider::new(16).failing_on("UNREACHABLE");
    let config = RagConfig::builder().chunk_size(40).chunk_overlap(10).ingest_workers(1).build().unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(provider))
        .vector_store(store.clone())
        .build()
        .unwrap();

    let report = pipeline.ingest_batch(COLLECTION, &documents).await.unwrap();

    assert_eq!(report.indexed().len(), 4);
    let failed = report.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "doc3");
    assert!(matches!(failed[0].1, RagError::EmbeddingService { .. }));

    let ids = store.document_ids(COLLECTION).await.unwrap();
    assert_eq!(ids, ["doc1", "doc2", "doc4", "doc5"]);
    let all = pipeline.query_top_k(COLLECTION, "topic", 1000).await.unwrap();
    assert!(all.iter().all(|r| r.chunk.document_id != "doc3"));
}

#[tokio::test]
async fn querying_with_a_different_model_is_rejected() {
    let store = Arc::new(InMemoryVectorStore::new());
    let indexing = pipeline_with(MockEmbeddingProvider::new(8), store.clone(), small_config());
    indexing.ingest(COLLECTION, &Document::new("a", "a.pdf", "some text")).await.unwrap();

    let querying = pipeline_with(
        MockEmbeddingProvider::new(8).with_model("other-embed"),
        store.clone(),
        small_config(),
    );
    let err = querying.query(COLLECTION, "some text").await.unwrap_err();
    assert!(matches!(err, RagError::ModelMismatch { .. }));

    let err = querying.ingest(COLLECTION, &Document::new("b", "b.pdf", "more")).await.unwrap_err();
    assert!(matches!(err, RagError::ModelMismatch { .. }));
    assert_eq!(store.document_ids(COLLECTION).await.unwrap(), ["a"]);
}

#[tokio::test]
async fn best_match_ranks_first_and_stats_reflect_index() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(MockEmbeddingProvider::new(32), store, small_config());
    let docs = vec![
        Document::new("rust", "rust.pdf", "ownership and borrowing"),
        Document::new("python", "python.pdf", "dynamic typing"),
    ];
    pipeline.ingest_batch(COLLECTION, &docs).await.unwrap();

    let results = pipeline.query(COLLECTION, "dynamic typing").await.unwrap();
    assert_eq!(results[0].chunk.document_id, "python");
    assert!((results[0].score - 1.0).abs() < 1e-5);

    let stats = pipeline.stats(COLLECTION).await.unwrap();
    assert_eq!(stats.chunk_count, 2);
    assert_eq!(stats.document_ids, ["python", "rust"]);
    assert_eq!(stats.embedding_model.as_deref(), Some("mock-embed"));
}

/// Every text lands on the same vector; texts mentioning "slow" take longer.
struct FlatEmbedding;

#[async_trait]
impl EmbeddingProvider for FlatEmbedding {
    async fn embed(&self, text: &str) -> pdfqa_rag::Result<Vec<f32>> {
        if text.contains("slow") {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model_id(&self) -> &str {
        "flat"
    }
}

#[tokio::test]
async fn equal_scores_follow_batch_order_not_embedding_speed() {
    let pipeline = RagPipeline::builder()
        .config(small_config())
        .embedding_provider(Arc::new(FlatEmbedding))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();
    let documents = vec![
        Document::new("first", "first.pdf", "slow page header"),
        Document::new("second", "second.pdf", "page header"),
        Document::new("third", "third.pdf", "page header again"),
    ];

    let report = pipeline.ingest_batch(COLLECTION, &documents).await.unwrap();
    assert_eq!(report.indexed().len(), 3);

    let order: Vec<String> = pipeline
        .query_top_k(COLLECTION, "page header", 3)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.chunk.document_id)
        .collect();
    assert_eq!(order, ["first", "second", "third"]);
}
