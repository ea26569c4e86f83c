use tracing::{debug, warn};

use super::citation::CitedText;
use super::prompts;
use crate::arxiv::{CitationSource, Document};
use crate::openai::{CompletionClient, CompletionRequest, GenerationError, ModelTier};

pub const SUMMARY_FAILED: &str = "Failed to generate summary. Please try again.";

/// How many leading documents can be cited inline.
pub const MAX_CITATIONS: usize = 5;

/// The first `MAX_CITATIONS` documents, in retrieval order.
pub fn top_citations(documents: &[Document]) -> Vec<CitationSource> {
    documents
        .iter()
        .take(MAX_CITATIONS)
        .map(CitationSource::from)
        .collect()
}

/// Ask for a cited two-paragraph synthesis of the abstracts and parse its citation markers.
pub async fn summarize(
    client: &impl CompletionClient,
    documents: &[Document],
) -> Result<CitedText, GenerationError> {
    let request = CompletionRequest::text(
        ModelTier::Summary,
        prompts::SUMMARY_SYSTEM,
        prompts::summary_prompt(documents),
    );

    let raw = client.complete(&request).await?;
    let text = CitedText::parse(&raw);

    let limit = documents.len().min(MAX_CITATIONS);
    let unresolved = text
        .cited_indices()
        .filter(|&i| i == 0 || i > limit)
        .count();
    if unresolved > 0 {
        warn!(unresolved, limit, "summary cites documents outside the citation list");
    }
    debug!(paragraphs = text.paragraphs.len(), "summary parsed");

    Ok(text)
}
