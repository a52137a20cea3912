//! rental-scan - QR scan station for event rental check-in and check-out
//!
//! Main entry point for the scan station.
//!
//! # Overview
//!
//! The station reads customer QR codes from a handheld scanner in keyboard mode (one code
//! per line on stdin), verifies each code against the rental backend, and prints either the
//! customer's details link or a targeted error. It initializes:
//! - Configuration loading ([`ConfigManager`], `RentalScan Data/scanner.yaml` plus
//!   `RENTAL_SCAN_*` environment overrides)
//! - Logging infrastructure (file rotation + optional console output on stderr)
//! - A current-thread tokio runtime (the scan workflow is single-threaded by design)
//! - The scan session ([`ScanSession`]) with a [`KeyboardWedgeDecoder`] over stdin
//!
//! # Execution Flow
//!
//! 1. Load configuration
//! 2. Initialize logging → logs/rental-scan.<date>
//! 3. Probe backend health (warning only)
//! 4. Initialize the scan session
//! 5. Run until the session navigates, stdin closes, or Ctrl-C. If the scanner cannot start,
//!    stdin lines go to the manual entry form instead
//! 6. Tear the session down, log the metrics summary, shut the runtime down

use anyhow::{Context, Result};
use rental_scan::models::AppConfig;
use rental_scan::services::{BackendTransport, RentalClient};
use rental_scan::state::StateChange;
use rental_scan::ui::{ConsoleNavigator, FeedbackState};
use rental_scan::{
    APP_NAME, CONFIG_DIR, ConfigManager, FeedbackBridge, FeedbackSurface, HttpTransport,
    KeyboardWedgeDecoder, LookupClient, ScanMetrics, ScanSession, VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

/// Main entry point for the scan station
///
/// # Errors
///
/// This function can fail if:
/// - The configuration directory cannot be created or `scanner.yaml` is invalid YAML
/// - Logging initialization fails (disk space, permissions)
/// - Tokio runtime creation fails (system resources)
/// - The HTTP client cannot be built (TLS backend)
fn main() -> Result<()> {
    let config_manager = ConfigManager::new(CONFIG_DIR)?;
    let config = config_manager.load_config()?;

    let _log_guard = rental_scan::logging::setup_logging(&config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!(
        "Configuration from {}: backend {}",
        config_manager.config_path(),
        config.server.base_url
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run_station(config));

    // stdin reads may still be parked on the blocking pool
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Application shutdown complete");
    result
}

async fn run_station(config: AppConfig) -> Result<()> {
    let transport: Arc<dyn BackendTransport> =
        Arc::new(HttpTransport::new(&config.server).context("Failed to build HTTP client")?);

    probe_backend(&RentalClient::new(Arc::clone(&transport), &config.server)).await;

    let metrics = Arc::new(ScanMetrics::new());
    let (bridge, renderer) =
        FeedbackBridge::spawn(&tokio::runtime::Handle::current(), render_to_console);

    let session = ScanSession::new(
        Arc::new(KeyboardWedgeDecoder::new(BufReader::new(tokio::io::stdin()))),
        LookupClient::new(transport, &config.server),
        Arc::new(bridge.clone()),
        Arc::new(ConsoleNavigator),
        Arc::clone(&metrics),
        &config,
    );

    spawn_state_logger(&session);

    let manual_form = match session.initialize().await {
        Ok(()) => {
            bridge.show_status("Ready to scan");
            None
        }
        Err(e) => {
            tracing::warn!("Scanner unavailable, reading codes as manual entry: {}", e);
            session.manual_entry()
        }
    };

    let manual_entry = async move {
        match manual_form {
            Some(form) => {
                form.read_lines(BufReader::new(tokio::io::stdin())).await;
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = session.wait_finished() => {
            tracing::info!("Scan session finished");
        }
        _ = manual_entry => {
            tracing::info!("Manual entry finished");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Interrupted, shutting down");
        }
    }

    session.teardown();
    metrics.log_summary();

    drop(session);
    drop(bridge);
    if tokio::time::timeout(Duration::from_secs(1), renderer)
        .await
        .is_err()
    {
        tracing::warn!("Feedback renderer did not finish in time");
    }

    Ok(())
}

/// Log backend health. The station keeps running either way.
async fn probe_backend(rental: &RentalClient) {
    match rental.health().await {
        Ok(health) if health.is_healthy() => {
            tracing::info!(
                "Backend healthy (database: {})",
                health.database.as_deref().unwrap_or("unknown")
            );
        }
        Ok(health) => {
            tracing::warn!(
                "Backend reports {} (database: {})",
                health.status,
                health.database.as_deref().unwrap_or("unknown")
            );
        }
        Err(e) => tracing::warn!("Backend health check failed: {}", e),
    }
}

/// Log session state changes for the operator log
fn spawn_state_logger(session: &ScanSession) {
    let mut rx = session.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(StateChange::StateTransition { from, to }) => {
                    tracing::debug!("Session state {} -> {}", from, to);
                }
                Ok(StateChange::CodeAccepted { code }) => {
                    tracing::debug!("Code {} accepted for lookup", code);
                }
                Ok(StateChange::StateReset) => break,
                Ok(change) => tracing::trace!("State change: {:?}", change),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("State logger lagged, {} events skipped", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn render_to_console(state: &FeedbackState) {
    if state.loading {
        println!("Looking up...");
    } else if let Some(error) = &state.error {
        println!("ERROR: {}", error);
    } else if let Some(status) = &state.status {
        println!("{}", status);
    }
}
