//! Model context protocol: structured metadata, caller context merging,
//! and the caching contract around query processing

use std::time::Duration;

use tracing::debug;
use tracing::info;

use crate::cache::CacheLayer;
use crate::errors::Result;
use crate::models::AdditionalContext;
use crate::models::ContextMetadata;
use crate::models::ModelContext;
use crate::models::QueryContext;
use crate::models::QueryPayload;
use crate::rag::prompts;
use crate::rag::RetrievalChain;

/// Processes queries into cacheable payloads with structured context.
///
/// The (query, additional_context) pair is the cache unit: a hit returns the
/// stored payload unchanged and bypasses all downstream work, including the
/// generation call. Two concurrent misses for the same fingerprint may both
/// compute and both write; last write wins, which is accepted since responses
/// for identical inputs are expected to be equivalent.
pub struct ContextProtocol {
    chain: RetrievalChain,
    cache: Option<CacheLayer>,
    max_context_documents: usize,
    cache_ttl: Duration,
}

impl ContextProtocol {
    pub fn new(
        chain: RetrievalChain,
        cache: Option<CacheLayer>,
        max_context_documents: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            chain,
            cache,
            max_context_documents,
            cache_ttl,
        }
    }

    /// Render the model input: system instructions, the original query, each
    /// retrieved document annotated with source and relevance, and any
    /// caller-supplied context appended verbatim
    fn format_context_for_model(&self, context: &ModelContext) -> String {
        let mut parts = vec![
            "=== System Instructions ===\n".to_string(),
            self.chain.system_prompt().to_string(),
            "\n=== Original Query ===\n".to_string(),
            context.original_query.clone(),
            "\n=== Retrieved Context ===\n".to_string(),
        ];

        for (i, (doc, metadata)) in context
            .retrieved_documents
            .iter()
            .zip(context.metadata.iter())
            .enumerate()
        {
            parts.push(format!(
                "Document {} (Source: {}, Relevance: {:.2}):\n{}\n",
                i + 1,
                metadata.source,
                metadata.relevance_score,
                doc.content
            ));
        }

        if let Some(additional) = &context.additional_context {
            parts.push("\n=== Additional Context ===\n".to_string());
            for (key, value) in additional {
                parts.push(format!("{key}: {value}\n"));
            }
        }

        parts.join("\n")
    }

    /// Process a query, consulting the cache first.
    ///
    /// On a miss (or `force_refresh`), retrieval runs, a [`ModelContext`] is
    /// built with per-document relevance metadata, the generation backend is
    /// invoked exactly once with the rendered context, and the payload is
    /// stored under the pair's fingerprint with a TTL before returning.
    ///
    /// # Errors
    /// - Embedding or generation backend failures (cache failures never
    ///   surface here)
    pub async fn process_query(
        &self,
        query: &str,
        additional_context: Option<&AdditionalContext>,
        force_refresh: bool,
    ) -> Result<QueryPayload> {
        // Cache hit bypasses all downstream work, including generation
        if !force_refresh {
            if let Some(cache) = &self.cache {
                if let Some(cached) = cache.get(query, additional_context).await {
                    info!("Returning cached payload for query");
                    return Ok(cached);
                }
            }
        }

        let retrieval = self
            .chain
            .retrieve(query, Some(self.max_context_documents))
            .await?;

        let payload = if retrieval.documents.is_empty() {
            // Designed short-circuit, not an error: no generation call
            debug!("Empty retrieval, returning canned response");
            QueryPayload {
                response: prompts::NO_KNOWLEDGE_RESPONSE.to_string(),
                context: QueryContext {
                    original_query: query.to_string(),
                    retrieved_documents: Vec::new(),
                    metadata: Vec::new(),
                    additional_context: additional_context.cloned(),
                },
            }
        } else {
            let metadata: Vec<ContextMetadata> = retrieval
                .documents
                .iter()
                .map(ContextMetadata::from_scored)
                .collect();

            let model_context = ModelContext {
                original_query: query.to_string(),
                retrieved_documents: retrieval
                    .documents
                    .iter()
                    .map(|doc| doc.document.clone())
                    .collect(),
                metadata: metadata.clone(),
                additional_context: additional_context.cloned(),
            };

            let formatted = self.format_context_for_model(&model_context);
            let response = self.chain.generator().generate(&formatted).await?;

            QueryPayload {
                response,
                context: QueryContext {
                    original_query: model_context.original_query,
                    retrieved_documents: model_context.retrieved_documents,
                    metadata,
                    additional_context: model_context.additional_context,
                },
            }
        };

        if let Some(cache) = &self.cache {
            // A failed put degrades to a logged no-op; the payload still returns
            cache
                .put(query, additional_context, &payload, Some(self.cache_ttl))
                .await;
        }

        Ok(payload)
    }

    /// Invalidate the cached payload for a (query, context) pair.
    /// No-op returning false when caching is disabled.
    pub async fn invalidate_cache(
        &self,
        query: &str,
        additional_context: Option<&AdditionalContext>,
    ) -> bool {
        match &self.cache {
            Some(cache) => cache.invalidate(query, additional_context).await,
            None => false,
        }
    }

    /// Clear every cached payload under this protocol's namespace.
    /// No-op returning false when caching is disabled.
    pub async fn clear_all_cache(&self) -> bool {
        match &self.cache {
            Some(cache) => cache.clear_all().await,
            None => false,
        }
    }
}
