//! Ingestion-to-retrieval flow: chunk incident files, build a store,
//! persist it, and query the restored copy

use std::sync::Arc;

use async_trait::async_trait;

use opsrag::backends::EmbeddingBackend;
use opsrag::ingest::DocumentProcessor;
use opsrag::store::VectorStore;
use opsrag::Result;

const DIMENSION: usize = 16;

struct StubEmbedder;

fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSION];
    for byte in text.to_lowercase().bytes() {
        vector[byte as usize % DIMENSION] += 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingBackend for StubEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text(text))
    }
}

const INCIDENTS: &str = "\
Incident INC-1042: Database connection pool exhaustion on primary
Description: Application servers exhausted the primary database connection pool during peak traffic.
Resolution: Restart the database service to clear connections, then raise the pool ceiling.

Incident INC-1055: Disk space exhaustion on log volume
Description: The application log volume filled up after debug logging was left enabled.
Resolution: Rotate and compress logs, disable debug logging, add a disk usage alert.
";

#[tokio::test]
async fn test_ingest_persist_and_query() {
    let data_dir = tempfile::tempdir().unwrap();
    let artifacts_dir = tempfile::tempdir().unwrap();
    std::fs::write(data_dir.path().join("incidents.txt"), INCIDENTS).unwrap();

    let processor = DocumentProcessor::new(300, 50).unwrap();
    let documents = processor.load_documents(data_dir.path()).unwrap();
    assert!(!documents.is_empty());
    for document in &documents {
        assert_eq!(document.metadata.source, "incidents.txt");
    }

    let store = VectorStore::new(Arc::new(StubEmbedder), DIMENSION);
    store.add(documents).await.unwrap();
    store.save(artifacts_dir.path()).await.unwrap();

    let restored = VectorStore::load(Arc::new(StubEmbedder), artifacts_dir.path()).unwrap();
    assert_eq!(restored.len().await, store.len().await);

    let results = restored
        .search("database connection pool exhausted", 2)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 2);
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    // The pool-exhaustion incident should rank first for this query
    assert!(results[0].document.content.contains("connection pool"));
}
