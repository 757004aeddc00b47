//! External service backends for embeddings and text generation
//!
//! Both services are opaque to the pipeline: the vector store only needs
//! `embed_documents`/`embed_query`, and the retrieval chain only needs
//! `generate`. Tests inject stub implementations through these traits.

pub mod ollama;

pub use ollama::OllamaEmbeddings;
pub use ollama::OllamaGenerator;

use async_trait::async_trait;

use crate::errors::Result;

/// Embedding service contract: text in, fixed-dimension vector out
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of document texts, preserving input order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Generation service contract: assembled prompt in, model output out
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
