//! Complete integration of retrieval, model context protocol, and caching

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::backends::EmbeddingBackend;
use crate::backends::GenerationBackend;
use crate::backends::OllamaEmbeddings;
use crate::backends::OllamaGenerator;
use crate::cache::CacheLayer;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::AdditionalContext;
use crate::models::QueryPayload;
use crate::rag::ContextProtocol;
use crate::rag::RetrievalChain;
use crate::store::VectorStore;

/// Top-level facade over the retrieval pipeline; the external interface
/// consumed by API layers and the CLI
pub struct IntegratedPipeline {
    protocol: ContextProtocol,
}

impl IntegratedPipeline {
    /// Build the pipeline from configuration: Ollama backends, the vector
    /// store loaded from its artifact pair, and caching per config.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Missing or inconsistent store artifacts (fatal at startup)
    /// - HTTP client build errors
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let embedder: Arc<dyn EmbeddingBackend> = Arc::new(OllamaEmbeddings::new(
            config.embeddings_endpoint(),
            config.embedding_model(),
        )?);
        let generator: Arc<dyn GenerationBackend> = Arc::new(OllamaGenerator::new(
            config.llm_endpoint(),
            config.llm_model(),
            config.llm.temperature,
        )?);

        let store = Arc::new(VectorStore::load(embedder, config.artifacts_dir())?);
        info!("Pipeline ready with {} store dimension", store.dimension());

        Ok(Self::from_parts(
            store,
            generator,
            config.cache_enabled(),
            config.cache_namespace().to_string(),
            Duration::from_secs(config.cache_ttl_secs()),
            config.max_context_documents(),
        ))
    }

    /// Assemble a pipeline from already-constructed components. Used by the
    /// CLI after ingestion and by tests injecting stub backends.
    pub fn from_parts(
        store: Arc<VectorStore>,
        generator: Arc<dyn GenerationBackend>,
        cache_enabled: bool,
        cache_namespace: String,
        cache_ttl: Duration,
        max_context_documents: usize,
    ) -> Self {
        let chain = RetrievalChain::new(store, generator);
        let cache = cache_enabled.then(|| CacheLayer::in_memory(cache_namespace, cache_ttl));
        let protocol = ContextProtocol::new(chain, cache, max_context_documents, cache_ttl);
        Self { protocol }
    }

    /// Process a query through the complete pipeline.
    ///
    /// # Errors
    /// - Embedding or generation backend failures
    pub async fn process_query(
        &self,
        query: &str,
        additional_context: Option<&AdditionalContext>,
        force_refresh: bool,
    ) -> Result<QueryPayload> {
        self.protocol
            .process_query(query, additional_context, force_refresh)
            .await
    }

    /// Invalidate the cache entry for a specific query
    pub async fn invalidate_cache(
        &self,
        query: &str,
        additional_context: Option<&AdditionalContext>,
    ) -> bool {
        self.protocol
            .invalidate_cache(query, additional_context)
            .await
    }

    /// Clear all cached payloads
    pub async fn clear_all_cache(&self) -> bool {
        self.protocol.clear_all_cache().await
    }
}
