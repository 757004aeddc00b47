//! Core data types shared across the retrieval pipeline

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Caller-supplied additional context, merged into the model input verbatim
pub type AdditionalContext = Map<String, Value>;

/// Provenance of a document chunk, attached at ingestion time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Basename of the file the chunk was cut from
    pub source: String,
    /// Ordinal position of this chunk within its source file
    pub chunk_index: usize,
    /// Chunk size (in characters) the splitter was configured with
    pub chunk_size: usize,
    /// Chunk overlap (in characters) the splitter was configured with
    pub chunk_overlap: usize,
    /// Total number of chunks produced from the source file
    pub total_chunks: usize,
}

/// A chunk of incident text, immutable once created.
///
/// Documents are produced by chunking at ingestion time and never mutated
/// after indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A document annotated with a similarity score, produced transiently per query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    /// Similarity in (0, 1], 1.0 only at zero distance
    pub score: f64,
}

/// Compact source attribution returned alongside a generated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub score: f64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl From<&ScoredDocument> for SourceRef {
    fn from(doc: &ScoredDocument) -> Self {
        Self {
            source: doc.document.metadata.source.clone(),
            score: doc.score,
            chunk_size: doc.document.metadata.chunk_size,
            chunk_overlap: doc.document.metadata.chunk_overlap,
        }
    }
}

/// Result of a single pass through the retrieval chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResult {
    pub response: String,
    pub sources: Vec<SourceRef>,
    /// The scored documents backing `sources`, pre-dedup, score-descending
    pub documents: Vec<ScoredDocument>,
}

/// Chunk sizing information carried in context metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub size: usize,
    pub overlap: usize,
}

/// Per-document metadata attached when building a model context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub source: String,
    pub relevance_score: f64,
    pub chunk_info: ChunkInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ContextMetadata {
    pub fn from_scored(doc: &ScoredDocument) -> Self {
        Self {
            source: doc.document.metadata.source.clone(),
            relevance_score: doc.score,
            chunk_info: ChunkInfo {
                size: doc.document.metadata.chunk_size,
                overlap: doc.document.metadata.chunk_overlap,
            },
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Structured context for the model: the unit that is formatted into a
/// prompt and the unit that is cached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelContext {
    pub original_query: String,
    pub retrieved_documents: Vec<Document>,
    pub metadata: Vec<ContextMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<AdditionalContext>,
}

/// Context section of a processed query payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryContext {
    pub original_query: String,
    pub retrieved_documents: Vec<Document>,
    pub metadata: Vec<ContextMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<AdditionalContext>,
}

/// Full response payload for a processed query; also the cached value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPayload {
    pub response: String,
    pub context: QueryContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> DocumentMetadata {
        DocumentMetadata {
            source: "kb1.txt".to_string(),
            chunk_index: 0,
            chunk_size: 1500,
            chunk_overlap: 200,
            total_chunks: 1,
        }
    }

    #[test]
    fn test_source_ref_from_scored_document() {
        let scored = ScoredDocument {
            document: Document::new("Restart the database service", sample_metadata()),
            score: 0.8312,
        };
        let source = SourceRef::from(&scored);
        assert_eq!(source.source, "kb1.txt");
        assert_eq!(source.chunk_size, 1500);
        assert_eq!(source.chunk_overlap, 200);
        assert!((source.score - 0.8312).abs() < f64::EPSILON);
    }

    #[test]
    fn test_context_metadata_carries_chunk_info() {
        let scored = ScoredDocument {
            document: Document::new("content", sample_metadata()),
            score: 0.5,
        };
        let meta = ContextMetadata::from_scored(&scored);
        assert_eq!(meta.chunk_info.size, 1500);
        assert_eq!(meta.chunk_info.overlap, 200);
        assert!(meta.timestamp.is_some());
    }

    #[test]
    fn test_query_payload_round_trips_through_json() {
        let payload = QueryPayload {
            response: "answer".to_string(),
            context: QueryContext {
                original_query: "query".to_string(),
                retrieved_documents: vec![Document::new("content", sample_metadata())],
                metadata: vec![],
                additional_context: None,
            },
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: QueryPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.response, "answer");
        assert_eq!(back.context.retrieved_documents.len(), 1);
    }
}
