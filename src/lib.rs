pub mod backends;
pub mod cache;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod rag;
pub mod store;

pub use config::AppConfig;
pub use errors::*;
pub use pipeline::IntegratedPipeline;
