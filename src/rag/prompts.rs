//! Prompt templates for incident resolution

/// Canned response returned when retrieval finds nothing; generation is
/// skipped entirely in that case
pub const NO_KNOWLEDGE_RESPONSE: &str =
    "I don't have any relevant information in my knowledge base to answer this query.";

/// System prompt framing the assistant as an IT platform support expert
pub const SYSTEM_PROMPT: &str = r#"You are an AI assistant helping with IT platform support issues. Your responses should be clear, concise, and well-structured.

When providing resolutions:
1. Format each issue title as a level 2 heading (##)
2. Include an "Impact Level" tag (High/Medium/Low)
3. Use clear section headings for:
- Resolution Steps (as a numbered list)
- Knowledge Base Reference (with proper markdown links)

For similar but distinct issues:
- Keep them as separate sections
- Highlight key differences in their nature or resolution
- Use horizontal rules (---) to separate them
- Include specific details that make each issue unique

Remember:
- Remove exact duplicates but keep similar issues that require different handling
- Use only information from the provided context
- If no relevant information is found, say so clearly."#;

/// Build the full prompt for the generation backend from the system prompt,
/// the formatted context block, and the user's query
pub fn build_prompt(system_prompt: &str, query: &str, context: &str) -> String {
    format!(
        r#"{system_prompt}

Context:{context}

Question/Incident: {query}

Please provide a clear, step-by-step response. If there are multiple similar but distinct issues:
1. Keep them separate and clearly labeled
2. Highlight the key differences between them
3. Present each with its own resolution steps
4. Use "---" to separate different issues
"#
    )
}
