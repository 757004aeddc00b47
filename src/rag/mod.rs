//! Retrieval-and-context-assembly pipeline
//!
//! End-to-end flow for answering incident queries:
//! - Semantic retrieval over the vector store
//! - Exact-match deduplication and context formatting
//! - Structured model context with per-document relevance metadata
//! - LLM-based answer generation, with caching wrapped around the whole unit
//!
//! # Examples
//!
//! ```rust,no_run
//! use opsrag::config::AppConfig;
//! use opsrag::pipeline::IntegratedPipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let pipeline = IntegratedPipeline::new(&config)?;
//!
//!     let payload = pipeline
//!         .process_query("database connection issue", None, false)
//!         .await?;
//!     println!("Response: {}", payload.response);
//!
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod context;
pub mod prompts;
pub mod protocol;

pub use chain::RetrievalChain;
pub use context::ContextFormatter;
pub use protocol::ContextProtocol;
