use super::transport::{BackendTransport, HttpMethod, TransportError, send_with_limit};
use crate::models::ServerConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Package check-in/check-out actions the backend accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageAction {
    CheckoutOne,
    CheckinOne,
    CheckoutAll,
    CheckinAll,
}

impl PackageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageAction::CheckoutOne => "checkout_one",
            PackageAction::CheckinOne => "checkin_one",
            PackageAction::CheckoutAll => "checkout_all",
            PackageAction::CheckinAll => "checkin_all",
        }
    }
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-customer package counts after an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSummary {
    pub total_packages: u32,
    pub available_packages: u32,
    pub rented_packages: u32,
    pub has_packages: bool,
    pub all_returned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageActionResult {
    pub message: String,
    pub package_summary: PackageSummary,

    /// Backend sent the "all returned" email
    pub email_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,

    #[serde(default)]
    pub database: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RentalError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Action rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    package_summary: Option<PackageSummary>,

    #[serde(default)]
    email_sent: bool,

    #[serde(default)]
    error: Option<String>,
}

/// Client for the rental actions staff take after a successful lookup
#[derive(Clone)]
pub struct RentalClient {
    transport: Arc<dyn BackendTransport>,
    health_path: String,
    request_timeout: Duration,
}

impl RentalClient {
    pub fn new(transport: Arc<dyn BackendTransport>, server: &ServerConfig) -> Self {
        Self {
            transport,
            health_path: server.health_path.clone(),
            request_timeout: server.request_timeout(),
        }
    }

    /// Check packages in or out for a customer
    pub async fn package_action(
        &self,
        user_id: u64,
        action: PackageAction,
    ) -> Result<PackageActionResult, RentalError> {
        let path = format!("/api/package-action/{}", user_id);
        tracing::info!("Package action {} for user {}", action, user_id);

        let response = send_with_limit(
            self.transport.as_ref(),
            HttpMethod::Post,
            &path,
            Some(json!({ "action": action.as_str() })),
            self.request_timeout,
        )
        .await?;

        let parsed: Option<ActionResponse> = serde_json::from_str(&response.body).ok();

        // 400 carries the reason in the body
        if let Some(error) = parsed.as_ref().and_then(|p| p.error.clone()) {
            if !response.is_success() && response.status < 500 {
                tracing::warn!("Package action {} rejected: {}", action, error);
                return Err(RentalError::Rejected(error));
            }
        }

        if let Some(error) = TransportError::from_status(response.status) {
            return Err(error.into());
        }

        let parsed = parsed.ok_or_else(|| {
            TransportError::MalformedResponse("package action body is not JSON".to_string())
        })?;

        if !parsed.success {
            let reason = parsed
                .error
                .unwrap_or_else(|| "Package action failed".to_string());
            return Err(RentalError::Rejected(reason));
        }

        Ok(PackageActionResult {
            message: parsed.message.unwrap_or_default(),
            package_summary: parsed.package_summary.unwrap_or_default(),
            email_sent: parsed.email_sent,
        })
    }

    /// Probe backend and database health
    ///
    /// An unhealthy backend answers 500 with a status body; that is returned as `Ok`.
    pub async fn health(&self) -> Result<HealthStatus, RentalError> {
        let response = send_with_limit(
            self.transport.as_ref(),
            HttpMethod::Get,
            &self.health_path,
            None,
            self.request_timeout,
        )
        .await?;

        match serde_json::from_str::<HealthStatus>(&response.body) {
            Ok(health) => Ok(health),
            Err(e) => match TransportError::from_status(response.status) {
                Some(error) => Err(error.into()),
                None => Err(TransportError::MalformedResponse(e.to_string()).into()),
            },
        }
    }
}
