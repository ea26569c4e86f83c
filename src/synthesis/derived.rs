//! Artifacts derived from a finished summary: direct answer, consensus score, key facts
//! and related questions.
//!
//! Every generator resolves to a value. Failures (transport, API, malformed JSON, wrong
//! shape) are logged and replaced by that generator's fallback, so one failing call never
//! affects the others.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::prompts;
use crate::arxiv::Document;
use crate::openai::{CompletionClient, CompletionRequest, GenerationError, ModelTier};

const FALLBACK_FACT_EMOJI: &str = "📝";
const FALLBACK_FACT_POINT: &str = "No key points could be generated";

#[derive(Debug, thiserror::Error)]
pub enum DerivedError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response has no `{0}` of the expected type")]
    MissingField(&'static str),

    #[error("consensus score {0} is outside 0-100")]
    ScoreOutOfRange(f64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFact {
    #[serde(default)]
    pub emoji: String,
    pub point: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedQuestion {
    #[serde(default)]
    pub emoji: String,
    pub question: String,
}

/// Resolved derived artifacts; fields hold fallbacks where generation failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Derived {
    pub direct_answer: String,
    pub consensus_score: u8,
    pub key_facts: Vec<KeyFact>,
    pub related_questions: Vec<RelatedQuestion>,
}

/// Banding of the consensus score used when presenting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusLevel {
    Strong,
    Moderate,
    Weak,
}

impl ConsensusLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Strong,
            60..=79 => Self::Moderate,
            _ => Self::Weak,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Strong => "strong consensus",
            Self::Moderate => "moderate consensus",
            Self::Weak => "weak consensus",
        }
    }
}

pub fn key_facts_fallback() -> Vec<KeyFact> {
    vec![KeyFact {
        emoji: FALLBACK_FACT_EMOJI.to_string(),
        point: FALLBACK_FACT_POINT.to_string(),
    }]
}

/// Direct answer first, then score, key facts and related questions concurrently.
/// Never fails; the join waits for all three.
pub async fn derive_all(
    client: &impl CompletionClient,
    query: &str,
    documents: &[Document],
    synthesis: &str,
) -> Derived {
    let direct_answer = direct_answer(client, query, synthesis).await;

    let (consensus_score, key_facts, related_questions) = futures::join!(
        consensus_score(client, synthesis),
        key_facts(client, query, documents),
        related_questions(client, query, synthesis),
    );

    Derived {
        direct_answer,
        consensus_score,
        key_facts,
        related_questions,
    }
}

pub async fn direct_answer(client: &impl CompletionClient, query: &str, synthesis: &str) -> String {
    let request = CompletionRequest::text(
        ModelTier::Derived,
        prompts::DIRECT_ANSWER_SYSTEM,
        prompts::direct_answer_prompt(query, synthesis),
    );
    match client.complete(&request).await {
        Ok(answer) => answer.trim().to_string(),
        Err(e) => {
            warn!(generator = "direct_answer", error = %e, "generation failed, using fallback");
            String::new()
        }
    }
}

pub async fn consensus_score(client: &impl CompletionClient, synthesis: &str) -> u8 {
    or_fallback("consensus_score", request_consensus_score(client, synthesis).await, 0)
}

pub async fn key_facts(
    client: &impl CompletionClient,
    query: &str,
    documents: &[Document],
) -> Vec<KeyFact> {
    or_fallback(
        "key_facts",
        request_key_facts(client, query, documents).await,
        key_facts_fallback(),
    )
}

pub async fn related_questions(
    client: &impl CompletionClient,
    query: &str,
    synthesis: &str,
) -> Vec<RelatedQuestion> {
    or_fallback(
        "related_questions",
        request_related_questions(client, query, synthesis).await,
        Vec::new(),
    )
}

async fn request_consensus_score(
    client: &impl CompletionClient,
    synthesis: &str,
) -> Result<u8, DerivedError> {
    let request = CompletionRequest::json(
        ModelTier::Derived,
        prompts::CONSENSUS_SYSTEM,
        prompts::consensus_prompt(synthesis),
    );
    parse_consensus_score(&client.complete(&request).await?)
}

async fn request_key_facts(
    client: &impl CompletionClient,
    query: &str,
    documents: &[Document],
) -> Result<Vec<KeyFact>, DerivedError> {
    let request = CompletionRequest::json(
        ModelTier::Derived,
        prompts::KEY_FACTS_SYSTEM,
        prompts::key_facts_prompt(query, documents),
    );
    parse_array_field(&client.complete(&request).await?, "keyPoints")
}

async fn request_related_questions(
    client: &impl CompletionClient,
    query: &str,
    synthesis: &str,
) -> Result<Vec<RelatedQuestion>, DerivedError> {
    let request = CompletionRequest::json(
        ModelTier::Derived,
        prompts::RELATED_QUESTIONS_SYSTEM,
        prompts::related_questions_prompt(query, synthesis),
    );
    parse_array_field(&client.complete(&request).await?, "questions")
}

fn or_fallback<T>(generator: &'static str, result: Result<T, DerivedError>, fallback: T) -> T {
    match result {
        Ok(value) => {
            debug!(generator, "derived artifact ready");
            value
        }
        Err(e) => {
            warn!(generator, error = %e, "generation failed, using fallback");
            fallback
        }
    }
}

fn parse_consensus_score(content: &str) -> Result<u8, DerivedError> {
    let body: Value = serde_json::from_str(content)?;
    let score = body
        .get("consensusScore")
        .and_then(Value::as_f64)
        .ok_or(DerivedError::MissingField("consensusScore"))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(DerivedError::ScoreOutOfRange(score));
    }
    Ok(score.round() as u8)
}

/// Deserialize `field` of a JSON object reply, which must be an array of `T`.
fn parse_array_field<T: serde::de::DeserializeOwned>(
    content: &str,
    field: &'static str,
) -> Result<Vec<T>, DerivedError> {
    let mut body: Value = serde_json::from_str(content)?;
    match body.get_mut(field).map(Value::take) {
        Some(items @ Value::Array(_)) => Ok(serde_json::from_value(items)?),
        _ => Err(DerivedError::MissingField(field)),
    }
}
