//! Incident document ingestion: loading and chunking
//!
//! Splits raw incident files into bounded-size chunks along a hierarchical
//! separator ladder. The default ladder prioritizes incident boundaries so
//! each incident stays a complete retrieval unit when possible, with overlap
//! to maintain context between related incidents.

use std::path::Path;

use tracing::debug;
use tracing::info;

use crate::errors::OpsRagError;
use crate::errors::Result;
use crate::models::Document;
use crate::models::DocumentMetadata;

/// Separator ladder tuned for incident report files: split at incident
/// boundaries first, then paragraphs, lines, words, and finally characters
pub const INCIDENT_SEPARATORS: &[&str] = &["\n\nIncident", "\n\nDescription:", "\n\n", "\n", " "];

/// Splits incident files into chunked [`Document`]s with provenance metadata
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl DocumentProcessor {
    /// Create a processor with the incident-tuned separator ladder.
    ///
    /// # Errors
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_separators(
            chunk_size,
            chunk_overlap,
            INCIDENT_SEPARATORS.iter().map(ToString::to_string).collect(),
        )
    }

    /// Create a processor with a custom separator ladder
    ///
    /// # Errors
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(OpsRagError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(OpsRagError::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    /// Split raw text into chunks respecting the configured size and ladder
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        split_and_merge(text, self.chunk_size, self.chunk_overlap, &separators)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Chunk a single file's contents into documents with metadata
    pub fn process_file(&self, source: &str, content: &str) -> Vec<Document> {
        let chunks = self.split_text(content);
        let total_chunks = chunks.len();
        chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_index, chunk)| {
                Document::new(
                    chunk,
                    DocumentMetadata {
                        source: source.to_string(),
                        chunk_index,
                        chunk_size: self.chunk_size,
                        chunk_overlap: self.chunk_overlap,
                        total_chunks,
                    },
                )
            })
            .collect()
    }

    /// Load and chunk all `.txt` files from a directory.
    ///
    /// Files are processed in sorted name order so ingestion is deterministic.
    ///
    /// # Errors
    /// - Directory or file read failures
    pub fn load_documents<P: AsRef<Path>>(&self, directory: P) -> Result<Vec<Document>> {
        let directory = directory.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(directory)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let source = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let chunks = self.process_file(&source, &content);
            debug!("Chunked {} into {} documents", source, chunks.len());
            documents.extend(chunks);
        }

        info!(
            "Loaded {} document chunks from {}",
            documents.len(),
            directory.display()
        );
        Ok(documents)
    }
}

/// Split text by the first separator in the ladder, then merge segments into
/// chunks that respect `chunk_size`. Oversized segments recurse into the
/// next-level separator; past the last level, split by raw character count.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.len() <= chunk_size || separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining = &separators[1..];

    let segments: Vec<&str> = if separator == " " {
        text.split(' ').collect()
    } else {
        split_keeping_separator(text, separator)
    };

    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in segments {
        if current.is_empty() {
            current = segment.to_string();
        } else if current.len() + segment.len() <= chunk_size {
            if separator == " " {
                current.push(' ');
            }
            current.push_str(segment);
        } else {
            flush_chunk(&mut chunks, current, chunk_size, chunk_overlap, remaining);
            current = segment.to_string();
        }
    }

    if !current.is_empty() {
        flush_chunk(&mut chunks, current, chunk_size, chunk_overlap, remaining);
    }

    chunks
}

fn flush_chunk(
    chunks: &mut Vec<String>,
    current: String,
    chunk_size: usize,
    chunk_overlap: usize,
    remaining: &[&str],
) {
    if current.len() > chunk_size {
        chunks.extend(split_and_merge(&current, chunk_size, chunk_overlap, remaining));
    } else {
        chunks.push(current);
    }
}

/// Split text at a separator, keeping the separator attached to the start of
/// the following segment so incident headers stay with their bodies
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find(separator) {
        let boundary = search_from + pos;
        if boundary > start {
            result.push(&text[start..boundary]);
            start = boundary;
        }
        search_from = boundary + separator.len();
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-count splitting with overlap, used at the bottom of the ladder
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let bytes_boundary = |index: usize| -> usize {
        let mut index = index.min(text.len());
        while index < text.len() && !text.is_char_boundary(index) {
            index += 1;
        }
        index
    };

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let end = bytes_boundary(start + chunk_size);
        chunks.push(text[start..end].to_string());
        if end == text.len() {
            break;
        }
        let step = chunk_size.saturating_sub(chunk_overlap);
        if step == 0 {
            break;
        }
        start = bytes_boundary(start + step);
    }

    chunks
}
