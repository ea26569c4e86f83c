//! System instructions and user prompts for each generation call.

use crate::arxiv::Document;

pub const SUMMARY_SYSTEM: &str = "You are a research assistant providing two-paragraph summaries. \
Group related findings and use multiple citations when appropriate. Format citations as [1], [1,2], etc.";

pub const DIRECT_ANSWER_SYSTEM: &str = "Provide a direct, simple 2 sentence consensus answer to the \
question based on the given text. Use clear, accessible language.";

pub const CONSENSUS_SYSTEM: &str = "Analyze the given text and return a JSON object with a \
consensusScore field holding an integer consensus score between 0-100. Consider factors like \
certainty of statements, scientific backing, and clarity of conclusions.";

pub const KEY_FACTS_SYSTEM: &str = "Extract 5-6 key facts and figures in shorthand style \
(6-10 words each). Return as JSON with 'keyPoints' array containing objects with 'emoji' and \
'point' properties. Make points very concise.";

pub const RELATED_QUESTIONS_SYSTEM: &str = "Generate 5 related questions that users might also \
ask about this topic. Return as JSON with 'questions' array containing objects with 'emoji' and \
'question' properties. Make questions concise and engaging.";

/// Abstracts numbered from 1, separated by blank lines.
pub fn numbered_abstracts(documents: &[Document]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, d)| format!("[{}] {}", i + 1, d.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn summary_prompt(documents: &[Document]) -> String {
    format!(
        "Based on these research paper abstracts, provide a comprehensive summary. Group related \
findings together and cite papers using numbers in square brackets [1-5]. Always include at least \
one citation for each statement. Use multiple citations when findings are supported by multiple \
papers. Format citations at the end of sentences, before the period, like this [1] or [1,2,3]. \
Each major claim must have a citation.\n\n{}",
        numbered_abstracts(documents)
    )
}

pub fn direct_answer_prompt(query: &str, synthesis: &str) -> String {
    format!("Original question: {query}\n\nText to summarize: {synthesis}")
}

pub fn consensus_prompt(synthesis: &str) -> String {
    format!("Analyze this text and provide a consensus score: {synthesis}")
}

pub fn key_facts_prompt(query: &str, documents: &[Document]) -> String {
    format!(
        "Extract facts and figures that are relevant to the user's prompt \"{query}\" from these \
abstracts:\n\n{}",
        numbered_abstracts(documents)
    )
}

pub fn related_questions_prompt(query: &str, synthesis: &str) -> String {
    format!("Generate related questions for: {query}\n\nBased on this content: {synthesis}")
}
