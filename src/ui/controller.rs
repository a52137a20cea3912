// Scan session controller
//
// Owns the decoder handle and drives the session state machine:
//
//   Idle -[initialize]-> Scanning -[decode]-> Paused -> LookupInFlight
//   LookupInFlight -[found]-> navigate, teardown
//   any state -[manual entry found]-> navigate, teardown
//   LookupInFlight -[not found / failure]-> Error -[resume timer]-> Scanning
//   Scanning -[page hidden]-> Paused -[page visible, timer]-> Scanning
//
// Decoder events are handled one at a time by a single pump task. Resume timers live in
// one slot so visibility toggles never stack up pending resumes.

use super::feedback::FeedbackSurface;
use super::flow::{FlowOutcome, LookupFlow};
use super::manual_entry::{ManualEntryForm, ManualEntryHost};
use super::navigation::Navigator;
use crate::decoder::{Decoder, DecoderError, DecoderEvent};
use crate::metrics::ScanMetrics;
use crate::models::{
    AppConfig, ConfigError, DecoderConfig, PageContainers, ScanCode, SessionSnapshot,
    SessionState, TimingConfig,
};
use crate::services::LookupClient;
use crate::state::{StateChange, StateManager};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Why the scanner could not start. Never fatal: manual entry is activated either way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitializationError {
    #[error("Page is not ready: {0}")]
    Containers(ConfigError),

    #[error("Invalid decoder configuration: {0}")]
    Config(ConfigError),

    #[error(transparent)]
    Decoder(#[from] DecoderError),

    #[error("Scan session is already initialized")]
    AlreadyInitialized,

    #[error("Scan session has been torn down")]
    Closed,
}

impl InitializationError {
    /// Message for the error banner, telling the operator what to do next
    pub fn remediation(&self) -> String {
        match self {
            InitializationError::Decoder(DecoderError::LibraryUnavailable) => {
                "QR scanner library failed to load. Please refresh the page or use manual entry below."
                    .to_string()
            }
            InitializationError::Decoder(DecoderError::NoCamera) => {
                "No camera found. Please connect a camera or use manual entry below.".to_string()
            }
            InitializationError::Decoder(DecoderError::PermissionDenied) => {
                "Camera access denied. Please allow camera permissions and refresh, or use manual entry below."
                    .to_string()
            }
            InitializationError::Decoder(DecoderError::Unsupported) => {
                "Camera scanning is not supported on this device. Please use manual entry below."
                    .to_string()
            }
            InitializationError::Decoder(DecoderError::Failed(detail)) => {
                format!("Unable to start camera ({}). Please use manual entry below.", detail)
            }
            InitializationError::Containers(e) | InitializationError::Config(e) => {
                format!("Scanner setup error: {}. Please use manual entry below.", e)
            }
            InitializationError::AlreadyInitialized => "Scanner is already running.".to_string(),
            InitializationError::Closed => {
                "Scanner was closed. Please reload to scan again.".to_string()
            }
        }
    }
}

struct SessionInner {
    decoder: Arc<dyn Decoder>,
    decoder_config: DecoderConfig,
    containers: PageContainers,
    timing: TimingConfig,
    max_code_length: usize,

    state: StateManager,
    flow: LookupFlow,
    feedback: Arc<dyn FeedbackSurface>,
    metrics: Arc<ScanMetrics>,
    manual_entry: ManualEntryHost,

    pump: Mutex<Option<JoinHandle<()>>>,
    pending_resume: Mutex<Option<JoinHandle<()>>>,

    initializing: AtomicBool,
    decoder_started: AtomicBool,
    torn_down: AtomicBool,

    /// Flips to `true` when the session is done: navigated, torn down, or out of events
    finished_tx: Arc<watch::Sender<bool>>,
}

impl SessionInner {
    fn release_decoder(&self) {
        if self.decoder_started.swap(false, Ordering::SeqCst) {
            self.decoder.stop();
            tracing::info!("Camera released");
        }
    }

    fn abort_pending_resume(&self) {
        if let Some(handle) = self.pending_resume.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.lock().unwrap().take() {
            pump.abort();
        }
        self.abort_pending_resume();
        self.release_decoder();
    }
}

/// The scan session: decoder lifecycle plus the state machine around it.
///
/// Cheap to clone; all clones drive the same session. Dropping the last clone releases
/// the camera even if [`teardown`](Self::teardown) was never called.
///
/// # Example
/// ```ignore
/// let session = ScanSession::new(decoder, lookup_client, feedback, navigator, metrics, &config);
/// if let Err(e) = session.initialize().await {
///     // Remediation is already on screen and manual entry is available
///     tracing::warn!("Scanner unavailable: {e}");
/// }
/// session.wait_finished().await;
/// session.teardown();
/// ```
#[derive(Clone)]
pub struct ScanSession {
    inner: Arc<SessionInner>,
}

impl ScanSession {
    /// Create a session in `Idle`. Nothing touches the decoder until [`initialize`](Self::initialize).
    ///
    /// # Arguments
    /// * `decoder` - The camera (or wedge) decoder this session owns
    /// * `lookup_client` - Client for the verification endpoint
    /// * `feedback` - Where status, errors and the loading spinner go
    /// * `navigator` - Opens the details view after a successful lookup
    /// * `metrics` - Shared station counters
    /// * `config` - Decoder, timing, container, manual entry and server settings
    pub fn new(
        decoder: Arc<dyn Decoder>,
        lookup_client: LookupClient,
        feedback: Arc<dyn FeedbackSurface>,
        navigator: Arc<dyn Navigator>,
        metrics: Arc<ScanMetrics>,
        config: &AppConfig,
    ) -> Self {
        let (finished_tx, _) = watch::channel(false);
        let finished_tx = Arc::new(finished_tx);

        let flow = LookupFlow::new(
            lookup_client,
            Arc::clone(&feedback),
            navigator,
            Arc::clone(&metrics),
            config.server.base_url.clone(),
            config.server.details_path.clone(),
            config.timing.navigation_delay(),
            Arc::clone(&finished_tx),
        );

        Self {
            inner: Arc::new(SessionInner {
                decoder,
                decoder_config: config.decoder.clone(),
                containers: config.containers.clone(),
                timing: config.timing.clone(),
                max_code_length: config.manual_entry.max_code_length,
                state: StateManager::new(),
                flow,
                feedback,
                metrics,
                manual_entry: ManualEntryHost::new(config.containers.manual_entry.clone()),
                pump: Mutex::new(None),
                pending_resume: Mutex::new(None),
                initializing: AtomicBool::new(false),
                decoder_started: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
                finished_tx,
            }),
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.inner.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.state.subscribe()
    }

    /// Start the decoder and begin scanning.
    ///
    /// On failure the remediation message is shown, manual entry is activated, and the
    /// error is returned. A failed initialize may be retried.
    pub async fn initialize(&self) -> Result<(), InitializationError> {
        if self.inner.torn_down.load(Ordering::SeqCst) {
            return Err(InitializationError::Closed);
        }
        if self.inner.state.current() != SessionState::Idle
            || self.inner.initializing.swap(true, Ordering::SeqCst)
        {
            return Err(InitializationError::AlreadyInitialized);
        }

        tracing::info!("Initializing scanner");

        match self.start_decoder().await {
            Ok(events) => {
                let pump = self.spawn_pump(events);
                *self.inner.pump.lock().unwrap() = Some(pump);

                if let Err(e) = self
                    .inner
                    .state
                    .transition(&[SessionState::Idle], SessionState::Scanning)
                {
                    tracing::warn!("Scanner started but session moved on: {}", e);
                }
                self.inner.initializing.store(false, Ordering::SeqCst);
                tracing::info!("Scanner ready");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Scanner initialization failed: {}", e);
                self.inner.initializing.store(false, Ordering::SeqCst);
                self.inner.feedback.show_error(&e.remediation());
                self.activate_manual_entry();
                Err(e)
            }
        }
    }

    async fn start_decoder(&self) -> Result<mpsc::Receiver<DecoderEvent>, InitializationError> {
        self.inner
            .containers
            .validate()
            .map_err(InitializationError::Containers)?;

        let config = self
            .inner
            .decoder_config
            .validate(&self.inner.decoder.capabilities())
            .map_err(InitializationError::Config)?;

        let events = self.inner.decoder.start(&config).await?;
        self.inner.decoder_started.store(true, Ordering::SeqCst);

        // teardown may have run while the decoder was starting
        if self.inner.torn_down.load(Ordering::SeqCst) {
            self.inner.release_decoder();
            return Err(InitializationError::Closed);
        }

        Ok(events)
    }

    /// Dispatch decoder events one at a time. Holds only a weak reference to the session.
    fn spawn_pump(&self, mut events: mpsc::Receiver<DecoderEvent>) -> JoinHandle<()> {
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let session = ScanSession { inner };

                match event {
                    DecoderEvent::Decoded(raw) => {
                        session.on_decode_success(&raw).await;
                    }
                    DecoderEvent::DecodeFailure(reason) => session.on_decode_failure(&reason),
                }
            }

            tracing::info!("Decoder event stream closed");
            if let Some(inner) = weak.upgrade() {
                inner.finished_tx.send_replace(true);
            }
        })
    }

    /// Handle a decoded payload.
    ///
    /// Pauses the decoder before the lookup starts. A payload arriving while another lookup
    /// is pending is dropped.
    ///
    /// # Returns
    /// The lookup outcome, or `None` if no lookup ran
    pub async fn on_decode_success(&self, raw: &str) -> Option<FlowOutcome> {
        let code = match ScanCode::normalize_payload(raw, self.inner.max_code_length) {
            Ok(code) => code,
            Err(e) => {
                self.reject_payload(raw, &e.to_string());
                return None;
            }
        };

        if let Err(e) = self.inner.state.accept_code(code.as_str()) {
            tracing::debug!("Ignoring decode of {}: {}", code, e);
            self.inner.metrics.record_decode_ignored();
            return None;
        }

        self.inner.decoder.pause();
        self.inner.metrics.record_decode_accepted();
        tracing::info!("Scanned code {}", code);

        self.run_lookup(code).await
    }

    /// A readable payload that is not a scan code: show why and resume later
    fn reject_payload(&self, raw: &str, reason: &str) {
        if self
            .inner
            .state
            .transition(&[SessionState::Scanning], SessionState::Error)
            .is_err()
        {
            self.inner.metrics.record_decode_ignored();
            return;
        }

        self.inner.decoder.pause();
        tracing::warn!("Unusable scan payload {:?}: {}", raw, reason);
        self.inner.feedback.show_error(reason);
        self.schedule_resume(self.inner.timing.resume_delay(), true);
    }

    async fn run_lookup(&self, code: ScanCode) -> Option<FlowOutcome> {
        if let Err(e) = self
            .inner
            .state
            .transition(&[SessionState::Paused], SessionState::LookupInFlight)
        {
            tracing::warn!("Lookup for {} abandoned: {}", code, e);
            return None;
        }

        let outcome = self.inner.flow.run(&code).await;

        if outcome.should_resume() {
            if let Err(e) = self.inner.state.fail_lookup() {
                // torn down mid-lookup
                tracing::debug!("Not resuming after lookup: {}", e);
                return Some(outcome);
            }
            self.schedule_resume(self.inner.timing.resume_delay(), true);
        } else {
            self.inner.state.update(|s| {
                s.lookups_completed += 1;
                s.last_code = None;
            });
            self.teardown();
        }

        Some(outcome)
    }

    /// Decode noise (no code in frame). Counted and logged, never shown.
    pub fn on_decode_failure(&self, reason: &str) {
        self.inner.metrics.record_decode_noise();
        tracing::trace!("Decode noise: {}", reason);
    }

    /// Resume scanning after the fixed resume delay, replacing any pending resume.
    pub fn resume(&self) {
        self.schedule_resume(self.inner.timing.resume_delay(), true);
    }

    /// Resume scanning now if the session is paused or in error and the page is visible.
    ///
    /// # Returns
    /// `true` if the decoder was resumed
    pub fn resume_now(&self) -> bool {
        if self.inner.torn_down.load(Ordering::SeqCst) {
            return false;
        }
        if self.inner.state.read(|s| s.page_hidden) {
            tracing::debug!("Resume skipped, page hidden");
            return false;
        }

        match self
            .inner
            .state
            .transition(&SessionState::RESUMABLE, SessionState::Scanning)
        {
            Ok(_) => {
                self.inner.decoder.resume();
                self.inner.metrics.record_resume();
                tracing::info!("Scanning resumed");
                true
            }
            Err(e) => {
                tracing::debug!("Resume skipped: {}", e);
                false
            }
        }
    }

    /// Put a resume timer in the single pending slot.
    ///
    /// With `replace_pending` an existing timer is cancelled and restarted; without it an
    /// existing timer is kept and nothing new is scheduled.
    fn schedule_resume(&self, delay: Duration, replace_pending: bool) -> bool {
        let mut slot = self.inner.pending_resume.lock().unwrap();

        if let Some(handle) = slot.as_ref() {
            if !handle.is_finished() {
                if !replace_pending {
                    tracing::debug!("Resume already pending");
                    return false;
                }
                handle.abort();
            }
        }

        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                ScanSession { inner }.resume_now();
            }
        }));

        tracing::debug!("Resume scheduled in {:?}", delay);
        true
    }

    /// Page visibility changed.
    ///
    /// Hidden pauses the decoder and cancels any pending resume. Visible schedules one
    /// resume after the visibility delay unless one is already pending.
    pub fn on_visibility_change(&self, hidden: bool) {
        if self.inner.torn_down.load(Ordering::SeqCst) {
            return;
        }

        self.inner.state.set_page_hidden(hidden);

        if hidden {
            self.inner.abort_pending_resume();
            if self.inner.decoder_started.load(Ordering::SeqCst) {
                self.inner.decoder.pause();
            }
            let _ = self
                .inner
                .state
                .transition(&[SessionState::Scanning], SessionState::Paused);
            tracing::debug!("Page hidden, scanner paused");
        } else if self.inner.state.current().is_resumable() {
            self.schedule_resume(self.inner.timing.visibility_resume_delay(), false);
        }
    }

    /// Release the camera and stop all session tasks.
    ///
    /// Idempotent, and safe to call before or without a successful initialize.
    pub fn teardown(&self) {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("Scan session already torn down");
            return;
        }

        tracing::info!("Tearing down scan session");

        self.inner.abort_pending_resume();
        if let Some(pump) = self.inner.pump.lock().unwrap().take() {
            pump.abort();
        }
        self.inner.release_decoder();
        self.inner.state.reset();
        self.inner.finished_tx.send_replace(true);
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }

    /// Attach the manual entry form (once) and return it.
    ///
    /// A manual lookup that navigates away tears the session down like a camera lookup does.
    pub fn activate_manual_entry(&self) -> Arc<ManualEntryForm> {
        let form = self.inner.manual_entry.attach(|| {
            let weak = Arc::downgrade(&self.inner);
            ManualEntryForm::new(self.inner.flow.clone(), self.inner.max_code_length)
                .with_navigation_hook(move || {
                    if let Some(inner) = weak.upgrade() {
                        tracing::info!("Manual lookup navigated away");
                        ScanSession { inner }.teardown();
                    }
                })
        });
        self.inner.state.activate_manual_entry();
        form
    }

    /// The manual entry form, if it has been activated
    pub fn manual_entry(&self) -> Option<Arc<ManualEntryForm>> {
        self.inner.manual_entry.form()
    }

    /// Wait until the session has navigated away, been torn down, or run out of decoder events
    pub async fn wait_finished(&self) {
        let mut finished_rx = self.inner.finished_tx.subscribe();
        let _ = finished_rx.wait_for(|finished| *finished).await;
    }
}
