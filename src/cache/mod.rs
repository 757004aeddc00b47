//! Caching layer for processed query payloads
//!
//! Entries are keyed by a stable fingerprint of (query, additional_context)
//! and namespaced under a fixed prefix so `clear_all` never touches foreign
//! keys in a shared backend. TTL is advisory to the backing store: an entry
//! not found after expiry is equivalent to absent.
//!
//! Cache failures never fail the overall query. A failing `get` is treated
//! as a miss; `put`/`invalidate`/`clear_all` degrade to a logged no-op
//! returning `false`.

pub mod memory;

pub use memory::InMemoryCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;
use tracing::warn;

use crate::errors::Result;
use crate::models::AdditionalContext;
use crate::models::QueryPayload;

/// Fingerprint format version, baked into every key so a format change can
/// never collide with entries written by an older build
const FINGERPRINT_VERSION: &str = "v1";

/// Key/value backend contract for cached payloads
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Delete every key under the prefix, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}

/// Render a JSON value with recursively sorted object keys, so logically
/// equal contexts always serialize to the same bytes
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).unwrap_or_default(),
                        canonical_json(&map[key])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}

/// Derive the deterministic fingerprint for a (query, context) pair.
///
/// The canonicalized context and the raw query are concatenated and hashed
/// with SHA-256, so identical inputs always produce the same key across
/// process restarts, independent of map key order.
pub fn fingerprint(query: &str, additional_context: Option<&AdditionalContext>) -> String {
    let context_str = additional_context
        .map(|ctx| canonical_json(&Value::Object(ctx.clone())))
        .unwrap_or_default();
    let combined = format!("{query}:{context_str}");

    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    format!("{FINGERPRINT_VERSION}:{}", hex::encode(hasher.finalize()))
}

/// TTL-bounded cache over processed query payloads
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    default_ttl: Duration,
}

impl CacheLayer {
    pub fn new(backend: Arc<dyn CacheBackend>, namespace: String, default_ttl: Duration) -> Self {
        Self {
            backend,
            namespace,
            default_ttl,
        }
    }

    /// Create a cache layer over a fresh in-memory backend
    pub fn in_memory(namespace: String, default_ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryCache::new()), namespace, default_ttl)
    }

    fn key(&self, query: &str, additional_context: Option<&AdditionalContext>) -> String {
        format!("{}{}", self.namespace, fingerprint(query, additional_context))
    }

    /// Look up a cached payload. Backend failures and undecodable entries
    /// are treated as misses.
    pub async fn get(
        &self,
        query: &str,
        additional_context: Option<&AdditionalContext>,
    ) -> Option<QueryPayload> {
        let key = self.key(query, additional_context);
        match self.backend.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(payload) => {
                    debug!("Cache hit for key {}", key);
                    Some(payload)
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss for key {}", key);
                None
            }
            Err(e) => {
                warn!("Cache get failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store a payload under the pair's fingerprint with a TTL.
    /// Returns false (and logs) on any failure.
    pub async fn put(
        &self,
        query: &str,
        additional_context: Option<&AdditionalContext>,
        payload: &QueryPayload,
        ttl: Option<Duration>,
    ) -> bool {
        let key = self.key(query, additional_context);
        let json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize payload for caching: {}", e);
                return false;
            }
        };
        let ttl = ttl.unwrap_or(self.default_ttl);
        match self.backend.set(&key, &json, ttl).await {
            Ok(()) => {
                debug!("Cached payload under {} (ttl {:?})", key, ttl);
                true
            }
            Err(e) => {
                warn!("Cache put failed: {}", e);
                false
            }
        }
    }

    /// Remove the entry for a (query, context) pair.
    /// Returns false (and logs) on any failure.
    pub async fn invalidate(
        &self,
        query: &str,
        additional_context: Option<&AdditionalContext>,
    ) -> bool {
        let key = self.key(query, additional_context);
        match self.backend.delete(&key).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache invalidation failed: {}", e);
                false
            }
        }
    }

    /// Remove every entry under this layer's namespace, leaving foreign keys
    /// in a shared backend untouched. Returns false (and logs) on failure.
    pub async fn clear_all(&self) -> bool {
        match self.backend.delete_prefix(&self.namespace).await {
            Ok(removed) => {
                debug!("Cleared {} cached entries", removed);
                true
            }
            Err(e) => {
                warn!("Cache clear failed: {}", e);
                false
            }
        }
    }
}
