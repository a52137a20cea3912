// Lookup flow - one code in, operator feedback and navigation out
//
// Shared by decoder successes and manual entry. The flow does not touch the session
// state machine; callers decide what a finished lookup means for scanning.

use super::feedback::FeedbackSurface;
use super::navigation::{Navigator, details_url};
use crate::metrics::ScanMetrics;
use crate::models::{CustomerSummary, LookupOutcome, ScanCode};
use crate::services::{LookupClient, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How a lookup ended, from the operator's point of view
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Customer shown and the details view opened. Terminal for the scan screen.
    Navigated {
        url: String,
        customer: CustomerSummary,
    },

    /// Backend rejected the code; the reason is on screen
    NotFound { reason: String },

    /// Backend unreachable or answered with an error; the classified message is on screen
    Failed(TransportError),
}

impl FlowOutcome {
    /// Whether scanning should pick up again after this outcome
    pub fn should_resume(&self) -> bool {
        !matches!(self, FlowOutcome::Navigated { .. })
    }
}

#[derive(Clone)]
pub struct LookupFlow {
    client: LookupClient,
    feedback: Arc<dyn FeedbackSurface>,
    navigator: Arc<dyn Navigator>,
    metrics: Arc<ScanMetrics>,
    base_url: String,
    details_path: String,
    navigation_delay: Duration,
    navigated_tx: Arc<watch::Sender<bool>>,
}

impl LookupFlow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: LookupClient,
        feedback: Arc<dyn FeedbackSurface>,
        navigator: Arc<dyn Navigator>,
        metrics: Arc<ScanMetrics>,
        base_url: impl Into<String>,
        details_path: impl Into<String>,
        navigation_delay: Duration,
        navigated_tx: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            client,
            feedback,
            navigator,
            metrics,
            base_url: base_url.into(),
            details_path: details_path.into(),
            navigation_delay,
            navigated_tx,
        }
    }

    pub fn feedback(&self) -> &Arc<dyn FeedbackSurface> {
        &self.feedback
    }

    pub fn metrics(&self) -> &Arc<ScanMetrics> {
        &self.metrics
    }

    /// Run one lookup and present its result.
    ///
    /// Exactly one backend call. On success the found message stays up for the navigation
    /// delay before the details view opens.
    pub async fn run(&self, code: &ScanCode) -> FlowOutcome {
        self.feedback.show_loading(true);
        let result = self.client.lookup(code).await;
        self.feedback.show_loading(false);

        match result {
            Ok(LookupOutcome::Found(customer)) => {
                self.metrics.record_lookup_found();
                self.feedback.show_status(&customer.found_message());

                tokio::time::sleep(self.navigation_delay).await;

                let url = details_url(&self.base_url, &self.details_path, code);
                self.navigator.navigate(&url);
                self.navigated_tx.send_replace(true);

                FlowOutcome::Navigated { url, customer }
            }
            Ok(LookupOutcome::NotFound { reason }) => {
                self.metrics.record_lookup_not_found();
                self.feedback.show_error(&reason);
                FlowOutcome::NotFound { reason }
            }
            Err(error) => {
                tracing::warn!("Lookup for {} failed: {}", code, error);
                self.metrics.record_lookup_failed();
                self.feedback.show_error(&error.user_message());
                FlowOutcome::Failed(error)
            }
        }
    }
}
