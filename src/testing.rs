//! Scripted client doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::arxiv::{Document, RetrievalError, SourceClient};
use crate::openai::{CompletionClient, CompletionRequest, GenerationError};

pub fn doc(title: &str) -> Document {
    Document {
        title: title.to_string(),
        authors: format!("{title} Author"),
        summary: format!("Abstract of {title}"),
        link: format!("http://arxiv.org/abs/{title}"),
        published: "1/1/2024".to_string(),
        doi: crate::arxiv::types::NO_DOI.to_string(),
    }
}

/// Replies keyed by system instruction. Unscripted instructions fail with a 404 API error.
pub struct ScriptedCompletion {
    routes: Vec<(&'static str, Result<String, u16>)>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `Err(code)` replies with `GenerationError::Api { code, .. }`.
    pub fn on(mut self, system: &'static str, reply: Result<&str, u16>) -> Self {
        self.routes.push((system, reply.map(str::to_string)));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, system: &str) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.system == system)
            .collect()
    }
}

impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .routes
            .iter()
            .find(|(system, _)| *system == request.system)
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Err(404));
        reply.map_err(|code| GenerationError::Api {
            code,
            message: "scripted failure".into(),
        })
    }
}

/// Pops one scripted result per search; an exhausted script returns no documents.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Document>, RetrievalError>>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn with(responses: Vec<Result<Vec<Document>, RetrievalError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn captured_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl SourceClient for ScriptedSource {
    async fn search(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }
}
