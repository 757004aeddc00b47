//! Retrieval chain: embed query, search, format, generate

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::backends::GenerationBackend;
use crate::errors::Result;
use crate::models::RagResult;
use crate::models::ScoredDocument;
use crate::models::SourceRef;
use crate::rag::context::ContextFormatter;
use crate::rag::prompts;
use crate::store::VectorStore;

/// Default number of context documents retrieved per query
pub const DEFAULT_NUM_DOCS: usize = 4;

/// Retrieval portion of a query: the scored documents and their compact
/// source attributions, both pre-dedup and score-descending
pub struct Retrieval {
    pub documents: Vec<ScoredDocument>,
    pub sources: Vec<SourceRef>,
}

/// Orchestrates retrieval, context formatting, and answer generation
pub struct RetrievalChain {
    store: Arc<VectorStore>,
    generator: Arc<dyn GenerationBackend>,
    formatter: ContextFormatter,
    system_prompt: String,
}

impl RetrievalChain {
    pub fn new(store: Arc<VectorStore>, generator: Arc<dyn GenerationBackend>) -> Self {
        Self::with_system_prompt(store, generator, prompts::SYSTEM_PROMPT.to_string())
    }

    pub fn with_system_prompt(
        store: Arc<VectorStore>,
        generator: Arc<dyn GenerationBackend>,
        system_prompt: String,
    ) -> Self {
        Self {
            store,
            generator,
            formatter: ContextFormatter::new(),
            system_prompt,
        }
    }

    /// Retrieve scored documents for a query without invoking generation.
    ///
    /// # Errors
    /// - Embedding backend failures
    /// - `k == 0`
    pub async fn retrieve(&self, query: &str, num_docs: Option<usize>) -> Result<Retrieval> {
        let k = num_docs.unwrap_or(DEFAULT_NUM_DOCS);
        let documents = self.store.search(query, k).await?;
        let sources = documents.iter().map(SourceRef::from).collect();
        debug!("Retrieved {} documents for query", documents.len());
        Ok(Retrieval { documents, sources })
    }

    /// Process a query through the full chain.
    ///
    /// Empty retrieval short-circuits to the canned no-knowledge response
    /// with empty sources; the generation backend is never called in that
    /// case.
    ///
    /// # Errors
    /// - Embedding or generation backend failures
    pub async fn query(&self, query: &str, num_docs: Option<usize>) -> Result<RagResult> {
        info!("Processing RAG query");

        let retrieval = self.retrieve(query, num_docs).await?;
        if retrieval.documents.is_empty() {
            debug!("No relevant documents found, skipping generation");
            return Ok(RagResult {
                response: prompts::NO_KNOWLEDGE_RESPONSE.to_string(),
                sources: Vec::new(),
                documents: Vec::new(),
            });
        }

        let context = self.formatter.format_context(&retrieval.documents);
        let prompt = prompts::build_prompt(&self.system_prompt, query, &context);
        let response = self.generator.generate(&prompt).await?;

        Ok(RagResult {
            response,
            sources: retrieval.sources,
            documents: retrieval.documents,
        })
    }

    /// System prompt in effect for this chain
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Generation backend shared with downstream consumers
    pub fn generator(&self) -> Arc<dyn GenerationBackend> {
        Arc::clone(&self.generator)
    }
}
