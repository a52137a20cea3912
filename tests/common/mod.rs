//! Shared fakes for the integration tests
//!
//! - [`FakeDecoder`]: a decoder whose events the test pushes by hand
//! - [`ScriptedTransport`]: a backend that answers from a queue and records every call
//! - [`RecordingFeedback`] / [`RecordingNavigator`]: capture what the operator would see

#![allow(dead_code)]

use async_trait::async_trait;
use rental_scan::decoder::{Decoder, DecoderCapabilities, DecoderError, DecoderEvent};
use rental_scan::models::{AppConfig, DecoderConfig};
use rental_scan::services::{
    BackendTransport, HttpMethod, LookupClient, TransportFailure, TransportResponse,
};
use rental_scan::ui::{
    FeedbackState, FeedbackSurface, FeedbackUpdate, Navigator, ScanSession,
};
use rental_scan::ScanMetrics;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const FOUND_ANN_LEE: &str =
    r#"{"success":true,"user":{"first_name":"Ann","last_name":"Lee","rental_status":1}}"#;
pub const INVALID_CODE: &str = r#"{"success":false,"error":"Invalid QR code"}"#;

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

pub struct FakeDecoder {
    tx: mpsc::Sender<DecoderEvent>,
    rx: Mutex<Option<mpsc::Receiver<DecoderEvent>>>,
    start_error: Option<DecoderError>,
    pub starts: AtomicUsize,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
    pub stops: AtomicUsize,
    pub started_with: Mutex<Option<DecoderConfig>>,
}

impl FakeDecoder {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(32);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            start_error: None,
            starts: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            started_with: Mutex::new(None),
        }
    }

    pub fn failing(error: DecoderError) -> Self {
        Self {
            start_error: Some(error),
            ..Self::new()
        }
    }

    /// Push a decoded payload as if the camera read it
    pub fn read(&self, payload: &str) {
        self.tx
            .try_send(DecoderEvent::Decoded(payload.to_string()))
            .unwrap();
    }

    pub fn noise(&self) {
        self.tx
            .try_send(DecoderEvent::DecodeFailure("No QR code found".to_string()))
            .unwrap();
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Decoder for FakeDecoder {
    fn capabilities(&self) -> DecoderCapabilities {
        DecoderCapabilities::default()
    }

    async fn start(
        &self,
        config: &DecoderConfig,
    ) -> Result<mpsc::Receiver<DecoderEvent>, DecoderError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }
        *self.started_with.lock().unwrap() = Some(config.clone());
        self.rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| DecoderError::Failed("already started".to_string()))
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

type Scripted = Result<TransportResponse, TransportFailure>;

/// Answers requests in order. Runs out → connection refused.
#[derive(Default)]
pub struct ScriptedTransport {
    answers: Mutex<VecDeque<Scripted>>,
    delay: Duration,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every answer arrives after `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse::new(status, body)));
        self
    }

    pub fn fail(self, failure: TransportFailure) -> Self {
        self.answers.lock().unwrap().push_back(Err(failure));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn codes_sent(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| call.body.as_ref()?.get("qr_code")?.as_str().map(String::from))
            .collect()
    }
}

#[async_trait]
impl BackendTransport for ScriptedTransport {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<TransportResponse, TransportFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.answers.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(TransportFailure::Connect("connection refused".to_string())))
    }
}

// ---------------------------------------------------------------------------
// Operator-facing sinks
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingFeedback {
    pub history: Mutex<Vec<FeedbackUpdate>>,
    state: Mutex<FeedbackState>,
}

impl RecordingFeedback {
    pub fn state(&self) -> FeedbackState {
        self.state.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| match u {
                FeedbackUpdate::Status(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| match u {
                FeedbackUpdate::Error(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, update: FeedbackUpdate) {
        self.history.lock().unwrap().push(update.clone());
        self.state.lock().unwrap().apply(update);
    }
}

impl FeedbackSurface for RecordingFeedback {
    fn show_status(&self, text: &str) {
        self.record(FeedbackUpdate::Status(text.to_string()));
    }

    fn show_error(&self, text: &str) {
        self.record(FeedbackUpdate::Error(text.to_string()));
    }

    fn show_loading(&self, loading: bool) {
        self.record(FeedbackUpdate::Loading(loading));
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub urls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub session: ScanSession,
    pub decoder: Arc<FakeDecoder>,
    pub transport: Arc<ScriptedTransport>,
    pub feedback: Arc<RecordingFeedback>,
    pub navigator: Arc<RecordingNavigator>,
    pub metrics: Arc<ScanMetrics>,
    pub config: AppConfig,
}

impl Harness {
    pub fn new(decoder: FakeDecoder, transport: ScriptedTransport) -> Self {
        Self::with_config(decoder, transport, AppConfig::default())
    }

    pub fn with_config(decoder: FakeDecoder, transport: ScriptedTransport, config: AppConfig) -> Self {
        let decoder = Arc::new(decoder);
        let transport = Arc::new(transport);
        let feedback = Arc::new(RecordingFeedback::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let metrics = Arc::new(ScanMetrics::new());

        let session = ScanSession::new(
            decoder.clone(),
            LookupClient::new(transport.clone(), &config.server),
            feedback.clone(),
            navigator.clone(),
            metrics.clone(),
            &config,
        );

        Self {
            session,
            decoder,
            transport,
            feedback,
            navigator,
            metrics,
            config,
        }
    }

    /// A harness whose session is already scanning
    pub async fn scanning(transport: ScriptedTransport) -> Self {
        let harness = Self::new(FakeDecoder::new(), transport);
        harness.session.initialize().await.unwrap();
        harness
    }
}

/// Let spawned tasks run without moving the paused clock far
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
