use crate::models::ServerConfig;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, COOKIE};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// HTTP verbs the backend endpoints use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Raw answer from the backend, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the HTTP layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),
}

/// Classified failure of a backend call, as reported to the operator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not authorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("Endpoint not found (HTTP 404)")]
    EndpointNotFound,

    #[error("Server error (HTTP {0})")]
    Server(u16),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl TransportError {
    /// Classify a non-2xx status. Returns `None` for success codes.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(TransportError::Unauthorized(status)),
            404 => Some(TransportError::EndpointNotFound),
            500..=599 => Some(TransportError::Server(status)),
            other => Some(TransportError::UnexpectedStatus(other)),
        }
    }

    /// Short machine-friendly name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Network(_) => "network",
            TransportError::Timeout(_) => "timeout",
            TransportError::Unauthorized(_) => "unauthorized",
            TransportError::EndpointNotFound => "not-found",
            TransportError::Server(_) => "server",
            TransportError::UnexpectedStatus(_) => "status",
            TransportError::MalformedResponse(_) => "malformed",
        }
    }

    /// Message shown in the error banner
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Network(_) => {
                "Network error: unable to reach the server. Check the connection and try again."
                    .to_string()
            }
            TransportError::Timeout(_) => {
                "The server took too long to respond. Please try again.".to_string()
            }
            TransportError::Unauthorized(_) => {
                "Your session has expired or you are not authorized. Please log in again."
                    .to_string()
            }
            TransportError::EndpointNotFound => {
                "Lookup service not found (404). Please contact an administrator.".to_string()
            }
            TransportError::Server(status) => {
                format!("Server error ({}). Please try again shortly.", status)
            }
            TransportError::UnexpectedStatus(status) => {
                format!("Unexpected response from server ({}).", status)
            }
            TransportError::MalformedResponse(_) => {
                "Received an invalid response from the server.".to_string()
            }
        }
    }

    fn from_failure(failure: TransportFailure, limit: Duration) -> Self {
        match failure {
            TransportFailure::Timeout => TransportError::Timeout(limit),
            TransportFailure::Connect(detail) | TransportFailure::Request(detail) => {
                TransportError::Network(detail)
            }
        }
    }
}

/// The network seam every backend call goes through.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendTransport: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<TransportResponse, TransportFailure>;
}

/// Send one request with an overall time limit, classifying transport failures.
///
/// Status codes are left for the caller; some endpoints carry a usable body on 4xx/5xx.
pub async fn send_with_limit(
    transport: &dyn BackendTransport,
    method: HttpMethod,
    path: &str,
    body: Option<serde_json::Value>,
    limit: Duration,
) -> Result<TransportResponse, TransportError> {
    match timeout(limit, transport.send(method, path, body)).await {
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", path, limit);
            Err(TransportError::Timeout(limit))
        }
        Ok(Err(failure)) => {
            tracing::warn!("{} failed: {}", path, failure);
            Err(TransportError::from_failure(failure, limit))
        }
        Ok(Ok(response)) => Ok(response),
    }
}

/// `reqwest` implementation of [`BackendTransport`]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl HttpTransport {
    pub fn new(server: &ServerConfig) -> Result<Self, TransportFailure> {
        let client = Client::builder()
            .timeout(server.request_timeout())
            .danger_accept_invalid_certs(server.accept_invalid_certs)
            .build()
            .map_err(|e| TransportFailure::Request(e.to_string()))?;

        if server.accept_invalid_certs {
            tracing::warn!("TLS certificate validation disabled for {}", server.base_url);
        }

        Ok(Self {
            client,
            base_url: server.base_url.trim_end_matches('/').to_string(),
            session_cookie: server.session_cookie.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify(error: reqwest::Error) -> TransportFailure {
        if error.is_timeout() {
            TransportFailure::Timeout
        } else if error.is_connect() {
            TransportFailure::Connect(error.to_string())
        } else {
            TransportFailure::Request(error.to_string())
        }
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<TransportResponse, TransportFailure> {
        let url = self.url(path);

        let mut request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        }
        .header(ACCEPT, "application/json");

        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, format!("session={}", cookie));
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(Self::classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(Self::classify)?;

        tracing::debug!("{:?} {} -> {}", method, url, status);
        Ok(TransportResponse { status, body })
    }
}
