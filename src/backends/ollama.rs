//! Ollama API clients for embeddings and generation

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::backends::EmbeddingBackend;
use crate::backends::GenerationBackend;
use crate::errors::OpsRagError;
use crate::errors::Result;

fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(120)) // Generation can be slow on large models
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| OpsRagError::Http(e.to_string()))
}

/// Client for the Ollama embeddings API
pub struct OllamaEmbeddings {
    endpoint: String,
    model: String,
    client: Client,
}

impl OllamaEmbeddings {
    /// Create a new embeddings client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client: build_http_client()?,
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OpsRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OpsRagError::Embedding(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| OpsRagError::Embedding(format!("Failed to parse response: {e}")))?;

        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama has no batch endpoint, so embed concurrently in bounded batches
        use futures::stream::{self, StreamExt};

        let concurrency = std::cmp::min(texts.len().max(1), 16);
        let futures: Vec<_> = texts.iter().map(|text| self.embed_one(text)).collect();
        let results: Vec<Result<Vec<f32>>> = stream::iter(futures)
            .buffered(concurrency)
            .collect()
            .await;

        let mut embeddings = Vec::with_capacity(results.len());
        for result in results {
            embeddings.push(result?);
        }

        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text).await
    }
}

/// Client for the Ollama generation API
pub struct OllamaGenerator {
    endpoint: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OllamaGenerator {
    /// Create a new generation client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            temperature,
            client: build_http_client()?,
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateOptions {
            temperature: f32,
        }

        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
            options: GenerateOptions,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Calling Ollama generate API: {}", url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OpsRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OpsRagError::Generation(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OpsRagError::Generation(format!("Failed to parse response: {e}")))?;

        Ok(result.response)
    }
}
