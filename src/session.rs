//! The live research session and the controller that drives it.
//!
//! The controller is the only writer of [`Session`]. Its methods take `&mut self`, so
//! a new submission cannot start while another is in flight: submissions are
//! serialized and each one runs to a settled state before the next begins.

use serde::Serialize;
use tracing::{info, warn};

use crate::arxiv::{CitationSource, Document, RetrievalError, SourceClient};
use crate::openai::CompletionClient;
use crate::synthesis::{
    CitedText, ConsensusLevel, Derived, SUMMARY_FAILED, derive_all, summarize, top_citations,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Searching,
    /// Retrieval failed; the message is shown to the user. Accepts a new query.
    RetrievalFailed(String),
    Synthesizing,
    /// The summary call failed; the summary holds the failure notice. Accepts new input the
    /// way `Ready` does, reusing the retrieved documents.
    SynthesisFailed,
    Ready,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Synthesis {
    pub summary: CitedText,
    /// Sources for inline citations: the first documents, at most `MAX_CITATIONS`.
    pub citations: Vec<CitationSource>,
    #[serde(flatten)]
    pub derived: Derived,
}

impl Synthesis {
    fn failed() -> Self {
        Self {
            summary: CitedText::plain(SUMMARY_FAILED),
            ..Self::default()
        }
    }

    /// Resolve a 1-based citation index. Indices outside the citation list yield `None`.
    pub fn citation(&self, index: usize) -> Option<&CitationSource> {
        index.checked_sub(1).and_then(|i| self.citations.get(i))
    }

    pub fn consensus_level(&self) -> ConsensusLevel {
        ConsensusLevel::from_score(self.derived.consensus_score)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub query: String,
    pub state: SessionState,
    pub documents: Vec<Document>,
    /// `None` until a summary has been attempted, and when no documents were found.
    pub synthesis: Option<Synthesis>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("no related question #{0}")]
    NoSuchQuestion(usize),

    #[error("Failed to fetch research articles. Please try again. ({0})")]
    Retrieval(#[from] RetrievalError),
}

pub struct Controller<S, C> {
    source: S,
    completion: C,
    session: Session,
}

impl<S: SourceClient, C: CompletionClient> Controller<S, C> {
    pub fn new(source: S, completion: C) -> Self {
        Self {
            source,
            completion,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a query to a settled state.
    ///
    /// Documents already in the session are reused; retrieval only happens when there
    /// are none. A retrieval failure leaves the session without documents, ready for
    /// another attempt.
    pub async fn submit(&mut self, query: &str) -> Result<&Session, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }

        self.session.query = query.to_string();
        self.session.state = SessionState::Searching;

        if self.session.documents.is_empty() {
            match self.source.search(query).await {
                Ok(documents) => self.session.documents = documents,
                Err(e) => {
                    warn!(error = %e, "retrieval failed");
                    self.session.documents.clear();
                    self.session.synthesis = None;
                    self.session.state = SessionState::RetrievalFailed(
                        "Failed to fetch research articles. Please try again.".to_string(),
                    );
                    return Err(e.into());
                }
            }
        } else {
            info!(
                documents = self.session.documents.len(),
                "reusing retrieved documents"
            );
        }

        self.synthesize().await;
        Ok(&self.session)
    }

    /// Ask the `n`th (1-based) related question against the current documents.
    pub async fn follow_up(&mut self, n: usize) -> Result<&Session, SessionError> {
        let question = self
            .session
            .synthesis
            .as_ref()
            .and_then(|s| n.checked_sub(1).and_then(|i| s.derived.related_questions.get(i)))
            .map(|q| q.question.clone())
            .ok_or(SessionError::NoSuchQuestion(n))?;
        info!(n, %question, "following up on related question");
        self.submit(&question).await
    }

    /// Drop documents and synthesis and return to `Idle`.
    pub fn reset(&mut self) -> &Session {
        self.session = Session::default();
        info!("session reset");
        &self.session
    }

    async fn synthesize(&mut self) {
        self.session.state = SessionState::Synthesizing;

        if self.session.documents.is_empty() {
            info!(query = %self.session.query, "no documents found, skipping synthesis");
            self.session.synthesis = None;
            self.session.state = SessionState::Ready;
            return;
        }

        let documents = &self.session.documents;
        match summarize(&self.completion, documents).await {
            Ok(summary) => {
                let plain = summary.to_plain();
                let derived =
                    derive_all(&self.completion, &self.session.query, documents, &plain).await;
                let citations = top_citations(documents);
                self.session.synthesis = Some(Synthesis {
                    summary,
                    citations,
                    derived,
                });
                self.session.state = SessionState::Ready;
            }
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                self.session.synthesis = Some(Synthesis::failed());
                self.session.state = SessionState::SynthesisFailed;
            }
        }
    }
}


#[cfg(test)]
mod http_tests {
    use std::time::Duration;

    use reqwest::Client;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::arxiv::ArxivClient;
    use crate::openai::OpenAiClient;
    use crate::synthesis::derived::key_facts_fallback;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>2024-01-10T00:00:00Z</published>
    <title>Aspartame and Cancer Risk</title>
    <summary>A cohort study of aspartame intake.</summary>
    <author><name>R. Chen</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v1</id>
    <published>2024-02-11T00:00:00Z</published>
    <title>Sweeteners and Glucose</title>
    <summary>Glucose response to sweeteners.</summary>
    <author><name>L. Park</name></author>
    <author><name>M. Ortiz</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00003v1</id>
    <published>2024-03-12T00:00:00Z</published>
    <title>Aspartame Metabolism</title>
    <summary>Metabolites of aspartame in vivo.</summary>
    <author><name>S. Ito</name></author>
  </entry>
</feed>"#;

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": content } }]
        }))
    }

    async fn mount_completion(server: &MockServer, marker: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains(marker))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn key_facts_network_failure_falls_back_end_to_end() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        mount_completion(
            &server,
            "two-paragraph summaries",
            completion("Low intake is safe [1].\n\nGlucose is unaffected [2, 3]."),
        )
        .await;
        mount_completion(
            &server,
            "direct, simple 2 sentence",
            completion("Aspartame is safe in normal amounts."),
        )
        .await;
        mount_completion(
            &server,
            "consensus score between 0-100",
            completion(r#"{"consensusScore": 84}"#),
        )
        .await;
        mount_completion(
            &server,
            "Extract 5-6 key facts",
            completion(r#"{"keyPoints": []}"#).set_delay(Duration::from_secs(5)),
        )
        .await;
        mount_completion(
            &server,
            "Generate 5 related questions",
            completion(r#"{"questions": [{"emoji": "🧃", "question": "Is diet soda safe?"}]}"#),
        )
        .await;

        let http = Client::new();
        let source = ArxivClient::with_endpoint(http.clone(), &format!("{}/api/query", server.uri()));
        let llm = OpenAiClient::with_base_url(http, &server.uri())
            .with_timeout(Duration::from_millis(500));
        let mut controller = Controller::new(source, llm);

        let session = controller.submit("Is aspartame bad for me?").await.unwrap();

        assert_eq!(session.state, SessionState::Ready);
        assert_eq!(session.documents.len(), 3);
        assert_eq!(session.documents[1].authors, "L. Park, M. Ortiz");

        let synthesis = session.synthesis.as_ref().unwrap();
        assert_eq!(synthesis.citations.len(), 3);
        assert_eq!(
            synthesis.summary.to_html(),
            "<p>Low intake is safe <sup class=\"citation\">[1]</sup>.</p>\
<p>Glucose is unaffected <sup class=\"citation\">[2,3]</sup>.</p>"
        );
        assert_eq!(synthesis.derived.direct_answer, "Aspartame is safe in normal amounts.");
        assert_eq!(synthesis.derived.consensus_score, 84);
        assert_eq!(synthesis.derived.key_facts, key_facts_fallback());
        assert_eq!(synthesis.derived.related_questions[0].question, "Is diet soda safe?");
    }

    #[tokio::test]
    async fn arxiv_outage_surfaces_retrieval_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = Client::new();
        let source = ArxivClient::with_endpoint(http.clone(), &format!("{}/api/query", server.uri()));
        let llm = OpenAiClient::with_base_url(http, &server.uri());
        let mut controller = Controller::new(source, llm);

        let err = controller.submit("q").await.unwrap_err();

        assert!(err.to_string().starts_with("Failed to fetch research articles"));
        assert!(matches!(
            controller.session().state,
            SessionState::RetrievalFailed(_)
        ));
    }
}
