use std::io::Read;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// No response was received.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The HTTP requests needed to exchange schemas with a repository.
///
/// Non-success statuses are returned as responses, not errors.
pub trait SchemaTransport {
    /// # Errors
    ///
    /// Returns an error if no response was received.
    fn get(&self, uri: &str, authorization: Option<&str>) -> Result<HttpResponse, TransportError>;

    /// # Errors
    ///
    /// Returns an error if no response was received.
    fn put(
        &self,
        uri: &str,
        authorization: Option<&str>,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a single reused `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    fn into_response(
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<HttpResponse, TransportError> {
        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(TransportError::Connection(err.to_string()));
            }
        };
        let status = response.status();
        let mut body = Vec::new();
        response.into_reader().read_to_end(&mut body)?;
        Ok(HttpResponse { status, body })
    }
}

impl SchemaTransport for UreqTransport {
    fn get(&self, uri: &str, authorization: Option<&str>) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.get(uri);
        if let Some(authorization) = authorization {
            request = request.set("Authorization", authorization);
        }
        Self::into_response(request.call())
    }

    fn put(
        &self,
        uri: &str,
        authorization: Option<&str>,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.put(uri).set("Content-Type", content_type);
        if let Some(authorization) = authorization {
            request = request.set("Authorization", authorization);
        }
        Self::into_response(request.send_bytes(body))
    }
}
