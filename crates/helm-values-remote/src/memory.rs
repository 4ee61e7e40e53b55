use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::transport::{HttpResponse, SchemaTransport, TransportError};

/// A request received by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub uri: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
struct MemoryState {
    responses: HashMap<String, HttpResponse>,
    unreachable: Vec<String>,
    put_status: Option<u16>,
    requests: Vec<RecordedRequest>,
}

/// In-memory transport serving canned responses.
///
/// Unknown URIs answer `404`, PUT answers `201` unless configured otherwise.
/// Clones share their state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_json(self, uri: impl Into<String>, body: &serde_json::Value) -> Self {
        let body = body.to_string();
        self.with_response(uri, HttpResponse::new(200, body))
    }

    #[must_use]
    pub fn with_response(self, uri: impl Into<String>, response: HttpResponse) -> Self {
        self.state().responses.insert(uri.into(), response);
        self
    }

    /// Fail every request to `uri` without a response.
    #[must_use]
    pub fn with_unreachable(self, uri: impl Into<String>) -> Self {
        self.state().unreachable.push(uri.into());
        self
    }

    #[must_use]
    pub fn with_put_status(self, status: u16) -> Self {
        self.state().put_status = Some(status);
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    fn record(&self, request: RecordedRequest) -> Result<(), TransportError> {
        let mut state = self.state();
        let unreachable = state.unreachable.iter().any(|u| *u == request.uri);
        let uri = request.uri.clone();
        state.requests.push(request);
        if unreachable {
            return Err(TransportError::Connection(format!("{uri} is unreachable")));
        }
        Ok(())
    }
}

impl SchemaTransport for MemoryTransport {
    fn get(&self, uri: &str, authorization: Option<&str>) -> Result<HttpResponse, TransportError> {
        self.record(RecordedRequest {
            method: "GET",
            uri: uri.to_string(),
            authorization: authorization.map(str::to_string),
            content_type: None,
            body: Vec::new(),
        })?;
        Ok(self
            .state()
            .responses
            .get(uri)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "Not Found")))
    }

    fn put(
        &self,
        uri: &str,
        authorization: Option<&str>,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError> {
        self.record(RecordedRequest {
            method: "PUT",
            uri: uri.to_string(),
            authorization: authorization.map(str::to_string),
            content_type: Some(content_type.to_string()),
            body: body.to_vec(),
        })?;
        let status = self.state().put_status.unwrap_or(201);
        Ok(HttpResponse::new(status, Vec::new()))
    }
}
