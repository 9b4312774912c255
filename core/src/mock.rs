//! Scripted in-memory transport for unit tests.
//!
//! Responses are served in FIFO order; every request is recorded so tests can
//! assert on what the client sent. Clones share the same script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

enum Scripted {
    Response(HttpResponse),
    Failure(String),
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, status: u16, body: &str) -> &Self {
        self.push_with_headers(status, &[], body)
    }

    pub(crate) fn push_with_headers(&self, status: u16, headers: &[(&str, &str)], body: &str) -> &Self {
        let response = HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
        };
        self.script.lock().unwrap().push_back(Scripted::Response(response));
        self
    }

    pub(crate) fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(status, &body.to_string())
    }

    pub(crate) fn push_transport_error(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Failure(message.to_string()));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(message.into()),
            None => Err(format!("no scripted response for {url}").into()),
        }
    }
}
