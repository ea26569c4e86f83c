pub mod feed;
pub mod types;

use std::env;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, info, warn};

pub use types::{CitationSource, Document};

const API_URL: &str = "http://export.arxiv.org/api/query";
pub const MAX_RESULTS: usize = 8;

/// Characters left unescaped in a URI component, matching `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid arXiv endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("arXiv request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("arXiv request failed: status {0}")]
    Status(u16),

    #[error("arXiv rejected the query: {0}")]
    Feed(String),
}

/// Source of candidate documents for a question.
/// Implemented by `ArxivClient` for production; mock implementations used in tests.
pub trait SourceClient {
    async fn search(&self, query: &str) -> Result<Vec<Document>, RetrievalError>;
}

#[derive(Clone)]
pub struct ArxivClient {
    http: Client,
    endpoint: String,
}

impl ArxivClient {
    pub fn from_env(http: Client) -> Result<Self, RetrievalError> {
        let endpoint = env::var("ARXIV_API_URL")
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| API_URL.to_string());
        url::Url::parse(&endpoint)?;
        Ok(Self { http, endpoint })
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(http: Client, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}?search_query=all:{}&start=0&max_results={MAX_RESULTS}",
            self.endpoint,
            utf8_percent_encode(query, COMPONENT)
        )
    }
}

impl SourceClient for ArxivClient {
    async fn search(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let url = self.search_url(query);
        debug!(%url, "querying arXiv");

        let response = self
            .http
            .get(&url)
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "arXiv returned non-success status");
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let documents = feed::parse_feed(&body)?;
        info!(query, documents = documents.len(), "arXiv search complete");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ONE_ENTRY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2301.00001v1</id>
    <published>2023-01-05T00:00:00Z</published>
    <title>Aspartame Intake</title>
    <summary>An abstract.</summary>
    <author><name>A. Author</name></author>
  </entry>
</feed>"#;

    #[test]
    fn search_url_encodes_like_uri_component() {
        let client = ArxivClient::with_endpoint(Client::new(), API_URL);
        let url = client.search_url("Is aspartame bad for me?");
        assert_eq!(
            url,
            "http://export.arxiv.org/api/query?search_query=all:Is%20aspartame%20bad%20for%20me%3F&start=0&max_results=8"
        );
    }

    #[test]
    fn search_url_keeps_unreserved_marks() {
        let client = ArxivClient::with_endpoint(Client::new(), API_URL);
        let url = client.search_url("CRISPR-Cas9 (humans)");
        assert!(url.contains("all:CRISPR-Cas9%20(humans)&"), "got: {url}");
    }

    #[tokio::test]
    async fn search_success_returns_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("search_query", "all:aspartame safety"))
            .and(query_param("start", "0"))
            .and(query_param("max_results", "8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ONE_ENTRY_FEED))
            .mount(&server)
            .await;

        let client =
            ArxivClient::with_endpoint(Client::new(), &format!("{}/api/query", server.uri()));
        let docs = client.search("aspartame safety").await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Aspartame Intake");
        assert_eq!(docs[0].published, "1/5/2023");
    }

    #[tokio::test]
    async fn search_503_returns_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            ArxivClient::with_endpoint(Client::new(), &format!("{}/api/query", server.uri()));
        let result = client.search("anything").await;
        assert!(matches!(result, Err(RetrievalError::Status(503))));
    }

    #[tokio::test]
    async fn search_unreachable_host_returns_network_error() {
        let client = ArxivClient::with_endpoint(Client::new(), "http://127.0.0.1:1/api/query");
        let result = client.search("anything").await;
        assert!(matches!(result, Err(RetrievalError::Network(_))));
    }
}
