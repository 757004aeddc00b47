//! Context formatting and exact-match deduplication

use crate::models::ScoredDocument;

/// Formats retrieved documents into a prompt-ready context block.
///
/// Deduplication is intentionally coarse: content-exact after case and
/// whitespace normalization, never semantic. Similar-but-distinct incidents
/// must both survive so the model can present them separately.
#[derive(Debug, Default)]
pub struct ContextFormatter;

impl ContextFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Normalize content for exact-match comparison: trimmed, lowercased,
    /// internal whitespace collapsed to single spaces
    fn normalize(content: &str) -> String {
        content
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Drop documents whose normalized content exactly matches one already
    /// seen. First occurrence wins; input order is preserved.
    pub fn dedup<'a>(&self, documents: &'a [ScoredDocument]) -> Vec<&'a ScoredDocument> {
        let mut seen = std::collections::HashSet::new();
        documents
            .iter()
            .filter(|doc| seen.insert(Self::normalize(&doc.document.content)))
            .collect()
    }

    /// Render surviving documents into a numbered plain-text block, each
    /// annotated with its source and chunk parameters (pass-through metadata,
    /// not recomputed)
    pub fn format_context(&self, documents: &[ScoredDocument]) -> String {
        let unique = self.dedup(documents);

        let parts: Vec<String> = unique
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                format!(
                    "Document {} (from {}, chunk_size={}, chunk_overlap={}):\n{}\n",
                    i + 1,
                    doc.document.metadata.source,
                    doc.document.metadata.chunk_size,
                    doc.document.metadata.chunk_overlap,
                    doc.document.content
                )
            })
            .collect();

        parts.join("\n")
    }
}
