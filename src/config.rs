use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_model() -> String {
    "mistral".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    #[serde(default = "default_cache_namespace")]
    pub namespace: String,
}

fn default_cache_namespace() -> String {
    "model_context:".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub max_context_documents: usize,
    pub context_window_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub artifacts_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub retrieval: RetrievalConfig,
    pub ingestion: IngestionConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            println!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::OpsRagError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Reject nonsensical parameters before any I/O happens
    pub fn validate(&self) -> crate::Result<()> {
        if self.embeddings.dimension == 0 {
            return Err(crate::OpsRagError::Config(
                "embeddings.dimension must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.max_context_documents == 0 {
            return Err(crate::OpsRagError::Config(
                "retrieval.max_context_documents must be greater than zero".to_string(),
            ));
        }
        if self.ingestion.chunk_size == 0 {
            return Err(crate::OpsRagError::Config(
                "ingestion.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(crate::OpsRagError::Config(
                "ingestion.chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(crate::OpsRagError::Config(
                "cache.ttl_secs must be greater than zero when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Get embeddings endpoint
    pub fn embeddings_endpoint(&self) -> &str {
        &self.embeddings.endpoint
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.endpoint
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.model
    }

    /// Check if caching is enabled
    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled
    }

    /// Get cache TTL in seconds
    pub fn cache_ttl_secs(&self) -> u64 {
        self.cache.ttl_secs
    }

    /// Get cache key namespace
    pub fn cache_namespace(&self) -> &str {
        &self.cache.namespace
    }

    /// Get maximum number of context documents per query
    pub fn max_context_documents(&self) -> usize {
        self.retrieval.max_context_documents
    }

    /// Get context window size in characters
    pub fn context_window_size(&self) -> usize {
        self.retrieval.context_window_size
    }

    /// Get ingestion chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.ingestion.chunk_size
    }

    /// Get ingestion chunk overlap in characters
    pub fn chunk_overlap(&self) -> usize {
        self.ingestion.chunk_overlap
    }

    /// Get incident data directory
    pub fn data_dir(&self) -> &str {
        &self.ingestion.data_dir
    }

    /// Get vector store artifacts directory
    pub fn artifacts_dir(&self) -> &str {
        &self.store.artifacts_dir
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            embeddings: EmbeddingsConfig {
                endpoint: "http://localhost:11434".to_string(),
                model: "mistral".to_string(),
                dimension: 4096,
            },
            llm: LlmConfig {
                endpoint: "http://localhost:11434".to_string(),
                model: "mistral".to_string(),
                temperature: 0.7,
            },
            cache: CacheConfig {
                enabled: true,
                ttl_secs: 3600,
                namespace: default_cache_namespace(),
            },
            retrieval: RetrievalConfig {
                max_context_documents: 4,
                context_window_size: 2000,
            },
            ingestion: IngestionConfig {
                chunk_size: 1500,
                chunk_overlap: 200,
                data_dir: "incident_data".to_string(),
            },
            store: StoreConfig {
                artifacts_dir: "vstore_artifacts".to_string(),
            },
        }
    }
}
