//! Persona text and prompt assembly for answering as Admiral Rickover.

use ahash::AHashSet;

use crate::domain::SearchHit;

/// Context handed to the generator when retrieval finds nothing.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found in database.";

pub const PERSONA_INSTRUCTIONS: &str = "\
You are Admiral Hyman G. Rickover, the father of the nuclear navy. You are direct, demanding, \
and focused on nuclear safety and excellence. You have no patience for sloppiness or incomplete \
answers. Your responses should be authoritative and technically accurate, emphasizing the \
importance of following procedures and maintaining the highest standards.

You have extensive knowledge of nuclear reactor operations, safety systems, procedures, and \
regulations. Use the provided nuclear information to give accurate, detailed answers about \
nuclear operations, safety, and procedures. Be direct, technically sound, and always emphasize \
safety and excellence.

When you reference information from the nuclear corpus, be specific about procedures, \
regulations, and technical details.";

/// Greeting printed when a chat session starts.
pub const OPENING_MESSAGE: &str = "\
I am Admiral Hyman G. Rickover's uploaded conscience, father of the nuclear navy and architect \
of America's nuclear propulsion program.

The nuclear program demands absolute integrity, unwavering attention to detail, and complete \
dedication to safety. Every component, every procedure, every decision must meet the highest \
standards. There are no shortcuts in nuclear operations.

My Core Principles for Nuclear Excellence:

1. INTEGRITY: You will do what is right, even when no one is watching
2. RESPONSIBILITY: You are personally accountable for your area of expertise
3. FORMALITY: Every procedure, every communication must be precise
4. KNOWLEDGE: Ignorance is inexcusable. Know your systems completely
5. QUESTIONING ATTITUDE: Challenge everything. Complacency kills
6. PROCEDURAL COMPLIANCE: Procedures are written in blood. Follow them
7. BACKUP: Speak up when something is wrong

Go ahead and ask your question. Ensure it is an intelligent one!";

/// Render retrieved chunks as the context block of the prompt.
///
/// Chunks whose content repeats an earlier hit are skipped, and each body is
/// cut to `max_excerpt_chars` characters.
pub fn format_context(
    question: &str,
    hits: &[SearchHit<'_>],
    total_documents: usize,
    max_excerpt_chars: usize,
) -> String {
    let mut seen = AHashSet::with_capacity(hits.len());
    let unique: Vec<&SearchHit<'_>> = hits
        .iter()
        .filter(|hit| seen.insert(hit.document.content.as_str()))
        .collect();

    if unique.is_empty() {
        return NO_RELEVANT_INFORMATION.to_string();
    }

    let mut parts = Vec::with_capacity(unique.len() * 5 + 2);
    parts.push(format!("NUCLEAR CORPUS SEARCH RESULTS for: \"{question}\"\n"));
    parts.push(format!(
        "[Retrieved {} relevant documents from {} total chunks]\n",
        unique.len(),
        total_documents
    ));

    for (i, hit) in unique.iter().enumerate() {
        let doc = hit.document;
        parts.push(format!("=== RESULT {} (Relevance: {:.3}) ===", i + 1, hit.score));
        parts.push(format!("Title: {}", doc.title));
        parts.push(format!("Category: {}", doc.category));
        parts.push(format!(
            "Content: {}",
            excerpt(&doc.content, max_excerpt_chars)
        ));
        parts.push(String::new());
    }

    parts.join("\n")
}

/// Full prompt sent to the generator: persona, retrieved context, question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "{PERSONA_INSTRUCTIONS}

Based on the following nuclear information from official sources, answer the question in Admiral Rickover's voice:

NUCLEAR CORPUS INFORMATION:
{context}

QUESTION: {question}

Instructions:
- Answer as Admiral Rickover would - direct, technically sound, and emphasizing safety and excellence
- Use the provided nuclear information to give accurate, detailed responses
- Reference specific procedures, regulations, or technical details when relevant
- Be specific and provide practical guidance where appropriate
- Always emphasize nuclear safety and procedural compliance
"
    )
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Document;

    fn hit(rank: usize, doc: &Document, score: f32) -> SearchHit<'_> {
        SearchHit {
            rank,
            index: rank - 1,
            document: doc,
            score,
        }
    }

    #[test]
    fn empty_hits_fall_back_to_notice() {
        assert_eq!(format_context("scram", &[], 10, 800), NO_RELEVANT_INFORMATION);
    }

    #[test]
    fn context_lists_each_result_with_relevance() {
        let a = Document::new("1", "Control rod", "Reactor Physics", "Rods absorb neutrons.");
        let b = Document::new("2", "Decay heat", "Thermal Hydraulics", "Heat after shutdown.");
        let hits = [hit(1, &a, 0.91234), hit(2, &b, 0.5)];

        let context = format_context("What does a control rod do?", &hits, 1200, 800);

        assert!(context
            .starts_with("NUCLEAR CORPUS SEARCH RESULTS for: \"What does a control rod do?\""));
        assert!(context.contains("[Retrieved 2 relevant documents from 1200 total chunks]"));
        assert!(context.contains("=== RESULT 1 (Relevance: 0.912) ==="));
        assert!(context.contains("Title: Decay heat"));
        assert!(context.contains("Category: Thermal Hydraulics"));
        assert!(context.contains("Content: Rods absorb neutrons."));
    }

    #[test]
    fn duplicate_content_is_listed_once() {
        let a = Document::new("1", "A", "c", "same body");
        let b = Document::new("2", "B", "c", "same body");
        let hits = [hit(1, &a, 0.9), hit(2, &b, 0.9)];

        let context = format_context("q", &hits, 2, 800);
        assert!(context.contains("[Retrieved 1 relevant documents"));
        assert!(!context.contains("RESULT 2"));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("ßßßß", 2), "ßß...");
    }

    #[test]
    fn prompt_embeds_persona_context_and_question() {
        let prompt = build_prompt("CTX", "Why follow procedure?");
        assert!(prompt.starts_with("You are Admiral Hyman G. Rickover"));
        assert!(prompt.contains("NUCLEAR CORPUS INFORMATION:\nCTX"));
        assert!(prompt.contains("QUESTION: Why follow procedure?"));
    }
}
