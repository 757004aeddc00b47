//! Vector store: flat similarity index plus parallel document list
//!
//! The index and the document list are append-only and co-indexed; the
//! ordinal position is the only join key, so `vectors.len() == documents.len()`
//! holds after every `add`. There is no deletion path - rebuilding from
//! scratch is the only way to shrink the store.

pub mod index;

pub use index::FlatIndex;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;

use crate::backends::EmbeddingBackend;
use crate::errors::OpsRagError;
use crate::errors::Result;
use crate::models::Document;
use crate::models::ScoredDocument;

/// Filename of the binary index artifact
pub const INDEX_FILENAME: &str = "index.bin";
/// Filename of the serialized document list artifact
pub const DOCUMENTS_FILENAME: &str = "documents.json";

/// Index and document list, guarded together so a reader can never observe
/// vectors without matching documents or vice versa
struct StoreInner {
    index: Option<FlatIndex>,
    documents: Vec<Document>,
}

/// Vector store over incident document chunks
pub struct VectorStore {
    embedder: Arc<dyn EmbeddingBackend>,
    dimension: usize,
    inner: RwLock<StoreInner>,
}

impl VectorStore {
    /// Create an empty store. The index itself is created lazily on first
    /// `add`, sized to the embedding dimension.
    pub fn new(embedder: Arc<dyn EmbeddingBackend>, dimension: usize) -> Self {
        Self {
            embedder,
            dimension,
            inner: RwLock::new(StoreInner {
                index: None,
                documents: Vec::new(),
            }),
        }
    }

    /// Embed and append documents to the store.
    ///
    /// Ingestion is administrative and rare; callers doing add-then-save
    /// should not interleave other writers between the two calls.
    ///
    /// # Errors
    /// - Embedding backend failures
    /// - Embedding dimension mismatches
    pub async fn add(&self, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;

        // Single write section keeps the index and document list co-indexed
        let mut inner = self.inner.write().await;
        let index = inner
            .index
            .get_or_insert_with(|| FlatIndex::new(self.dimension));
        index.add(&embeddings)?;
        inner.documents.extend(documents);

        debug_assert_eq!(
            inner.index.as_ref().map_or(0, FlatIndex::ntotal),
            inner.documents.len()
        );
        info!("Vector store now holds {} documents", inner.documents.len());
        Ok(())
    }

    /// Search for the k most similar documents.
    ///
    /// Scores map squared L2 distance to `exp(-sqrt(distance) / dimension)`,
    /// bounded in (0, 1] with 1.0 only at zero distance, rounded to 4 decimal
    /// digits. Results are sorted by score descending. Returns an empty list
    /// when the store is empty.
    ///
    /// # Errors
    /// - `k == 0` is rejected before any I/O
    /// - Embedding backend failures
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        if k == 0 {
            return Err(OpsRagError::Config(
                "search k must be greater than zero".to_string(),
            ));
        }

        {
            let inner = self.inner.read().await;
            if inner.index.is_none() || inner.documents.is_empty() {
                return Ok(Vec::new());
            }
        }

        let query_embedding = self.embedder.embed_query(query).await?;

        let inner = self.inner.read().await;
        let Some(index) = inner.index.as_ref() else {
            return Ok(Vec::new());
        };

        let hits = index.search(&query_embedding, k);
        let dimension = index.dimension() as f64;

        let mut results: Vec<ScoredDocument> = hits
            .into_iter()
            .filter(|(position, _)| *position < inner.documents.len()) // Guard against sentinel positions
            .map(|(position, distance)| {
                let l2_distance = f64::from(distance).sqrt();
                // Scaled exponential decay: 1.0 at zero distance, always in (0, 1]
                let score = (-l2_distance / dimension).exp();
                ScoredDocument {
                    document: inner.documents[position].clone(),
                    score: (score * 10_000.0).round() / 10_000.0,
                }
            })
            .collect();

        // Defensive re-sort: nearest-distance order coincides with descending
        // score, but the contract is score-descending
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!("Search returned {} documents", results.len());
        Ok(results)
    }

    /// Number of documents in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    /// Whether the store holds no documents
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Embedding dimension the store was created with
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Persist the index and document list as a co-located artifact pair
    ///
    /// # Errors
    /// - Saving an empty store (no index exists yet)
    /// - Filesystem errors
    pub async fn save<P: AsRef<Path>>(&self, directory: P) -> Result<()> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;

        let inner = self.inner.read().await;
        let Some(index) = inner.index.as_ref() else {
            return Err(OpsRagError::Persistence(
                "Cannot save an empty vector store".to_string(),
            ));
        };

        index.write_to(&directory.join(INDEX_FILENAME))?;

        let documents_json = serde_json::to_string(&inner.documents)?;
        std::fs::write(directory.join(DOCUMENTS_FILENAME), documents_json)?;

        info!(
            "Saved vector store ({} documents) to {}",
            inner.documents.len(),
            directory.display()
        );
        Ok(())
    }

    /// Restore a store from its artifact pair.
    ///
    /// Fatal if either artifact is missing or if the document count does not
    /// match the vector count - the pair is only valid together.
    pub fn load<P: AsRef<Path>>(
        embedder: Arc<dyn EmbeddingBackend>,
        directory: P,
    ) -> Result<Self> {
        let directory = directory.as_ref();

        let index = FlatIndex::read_from(&directory.join(INDEX_FILENAME))?;

        let documents_path = directory.join(DOCUMENTS_FILENAME);
        let documents_json = std::fs::read_to_string(&documents_path).map_err(|e| {
            OpsRagError::Persistence(format!(
                "Failed to read document artifact {}: {e}",
                documents_path.display()
            ))
        })?;
        let documents: Vec<Document> = serde_json::from_str(&documents_json)?;

        if index.ntotal() != documents.len() {
            return Err(OpsRagError::Persistence(format!(
                "Artifact pair is inconsistent: {} vectors but {} documents",
                index.ntotal(),
                documents.len()
            )));
        }

        info!(
            "Loaded vector store ({} documents) from {}",
            documents.len(),
            directory.display()
        );

        Ok(Self {
            embedder,
            dimension: index.dimension(),
            inner: RwLock::new(StoreInner {
                index: Some(index),
                documents,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    use async_trait::async_trait;

    /// Deterministic embedder: characters hashed into a small fixed-dimension
    /// bag-of-bytes vector, so similar texts land near each other
    struct StubEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingBackend for StubEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| embed_text(t, self.dimension)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(embed_text(text, self.dimension))
        }
    }

    fn embed_text(text: &str, dimension: usize) -> Vec<f32> {
        let mut vector = vec![0.0f32; dimension];
        for byte in text.to_lowercase().bytes() {
            vector[byte as usize % dimension] += 1.0;
        }
        vector
    }

    fn doc(content: &str, source: &str, chunk_index: usize) -> Document {
        Document::new(
            content,
            DocumentMetadata {
                source: source.to_string(),
                chunk_index,
                chunk_size: 1500,
                chunk_overlap: 200,
                total_chunks: 1,
            },
        )
    }

    fn store(dimension: usize) -> VectorStore {
        VectorStore::new(Arc::new(StubEmbedder { dimension }), dimension)
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_results() {
        let store = store(8);
        let results = store.search("anything", 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_k_is_rejected() {
        let store = store(8);
        assert!(store.search("anything", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_add_keeps_vectors_and_documents_parallel() {
        let store = store(8);
        store
            .add(vec![doc("one", "a.txt", 0), doc("two", "a.txt", 1)])
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);

        store.add(vec![doc("three", "b.txt", 0)]).await.unwrap();
        assert_eq!(store.len().await, 3);

        let inner = store.inner.read().await;
        assert_eq!(inner.index.as_ref().unwrap().ntotal(), 3);
        assert_eq!(inner.documents.len(), 3);
    }

    #[tokio::test]
    async fn test_search_scores_bounded_and_descending() {
        let store = store(8);
        store
            .add(vec![
                doc("database connection pool exhausted", "kb1.txt", 0),
                doc("disk full on application server", "kb2.txt", 0),
                doc("database connection timeout on replica", "kb3.txt", 0),
            ])
            .await
            .unwrap();

        let results = store.search("database connection issue", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        for window in results.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
        for result in &results {
            assert!(result.score > 0.0 && result.score <= 1.0);
        }
    }

    #[tokio::test]
    async fn test_identical_content_scores_one() {
        let store = store(8);
        store
            .add(vec![doc("restart the database service", "kb1.txt", 0)])
            .await
            .unwrap();

        let results = store
            .search("restart the database service", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_k_larger_than_store_returns_all() {
        let store = store(8);
        store
            .add(vec![doc("one", "a.txt", 0), doc("two", "a.txt", 1)])
            .await
            .unwrap();

        let results = store.search("one", 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(8);
        store
            .add(vec![
                doc("restart the database service", "kb1.txt", 0),
                doc("rotate the api gateway logs", "kb2.txt", 0),
            ])
            .await
            .unwrap();
        store.save(dir.path()).await.unwrap();

        let restored =
            VectorStore::load(Arc::new(StubEmbedder { dimension: 8 }), dir.path()).unwrap();
        assert_eq!(restored.len().await, 2);
        assert_eq!(restored.dimension(), 8);

        let results = restored.search("restart database", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.metadata.source, "kb1.txt");
    }

    #[tokio::test]
    async fn test_load_fails_when_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(8);
        store.add(vec![doc("one", "a.txt", 0)]).await.unwrap();
        store.save(dir.path()).await.unwrap();

        std::fs::remove_file(dir.path().join(DOCUMENTS_FILENAME)).unwrap();
        let result = VectorStore::load(Arc::new(StubEmbedder { dimension: 8 }), dir.path());
        assert!(matches!(result, Err(OpsRagError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_load_fails_on_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(8);
        store
            .add(vec![doc("one", "a.txt", 0), doc("two", "a.txt", 1)])
            .await
            .unwrap();
        store.save(dir.path()).await.unwrap();

        // Truncate the document list so it no longer matches the index
        let documents = vec![doc("one", "a.txt", 0)];
        std::fs::write(
            dir.path().join(DOCUMENTS_FILENAME),
            serde_json::to_string(&documents).unwrap(),
        )
        .unwrap();

        let result = VectorStore::load(Arc::new(StubEmbedder { dimension: 8 }), dir.path());
        assert!(matches!(result, Err(OpsRagError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_save_empty_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(8);
        assert!(store.save(dir.path()).await.is_err());
    }
}
