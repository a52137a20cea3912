use super::transport::{BackendTransport, HttpMethod, TransportError, send_with_limit};
use crate::models::{CustomerSummary, LookupOutcome, ScanCode, ServerConfig};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Reason shown when the backend rejects a code without saying why
pub const DEFAULT_NOT_FOUND_REASON: &str = "Invalid QR code";

/// Wire shape of the verification endpoint's answer
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,

    #[serde(default)]
    user: Option<CustomerSummary>,

    #[serde(default)]
    error: Option<String>,
}

/// Resolves a scan code to a customer through the backend verification endpoint.
///
/// Exactly one request per [`lookup`](Self::lookup) call. There is no retry; the operator
/// re-scans or resubmits instead.
#[derive(Clone)]
pub struct LookupClient {
    transport: Arc<dyn BackendTransport>,
    lookup_path: String,
    request_timeout: Duration,
}

impl LookupClient {
    pub fn new(transport: Arc<dyn BackendTransport>, server: &ServerConfig) -> Self {
        Self {
            transport,
            lookup_path: server.lookup_path.clone(),
            request_timeout: server.request_timeout(),
        }
    }

    pub fn lookup_path(&self) -> &str {
        &self.lookup_path
    }

    /// Look up one code.
    ///
    /// `Ok(NotFound)` means the backend answered and rejected the code. Everything that kept
    /// the backend from giving a logical answer is an `Err`.
    pub async fn lookup(&self, code: &ScanCode) -> Result<LookupOutcome, TransportError> {
        tracing::info!("Looking up scan code {}", code);

        let body = json!({ "qr_code": code.as_str() });
        let response = send_with_limit(
            self.transport.as_ref(),
            HttpMethod::Post,
            &self.lookup_path,
            Some(body),
            self.request_timeout,
        )
        .await?;

        if let Some(error) = TransportError::from_status(response.status) {
            tracing::warn!(
                "Lookup for {} failed with HTTP {} ({})",
                code,
                response.status,
                error.kind()
            );
            return Err(error);
        }

        let outcome = parse_verify_response(&response.body)?;

        match &outcome {
            LookupOutcome::Found(customer) => {
                tracing::info!(
                    "Code {} belongs to {} ({})",
                    code,
                    customer.display_name(),
                    customer.rental_status
                );
            }
            LookupOutcome::NotFound { reason } => {
                tracing::info!("Code {} rejected: {}", code, reason);
            }
        }

        Ok(outcome)
    }
}

/// Interpret a 2xx body from the verification endpoint
pub fn parse_verify_response(body: &str) -> Result<LookupOutcome, TransportError> {
    let response: VerifyResponse = serde_json::from_str(body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

    if response.success {
        return response
            .user
            .map(LookupOutcome::Found)
            .ok_or_else(|| TransportError::MalformedResponse("success without user".to_string()));
    }

    let reason = response
        .error
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_NOT_FOUND_REASON.to_string());

    Ok(LookupOutcome::NotFound { reason })
}
