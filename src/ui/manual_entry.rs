// Manual entry - operator-typed codes as a fallback to the decoder
//
// The form is attached to its container at most once. Submissions run the same lookup
// flow decoder reads use, but never touch the session state machine, so a manual lookup
// and a camera lookup can be in flight at the same time. A manual lookup that navigates
// away still ends the session through the form's navigation hook.

use super::flow::{FlowOutcome, LookupFlow};
use crate::decoder::{ScannerLine, next_scanner_line};
use crate::models::{ScanCode, ScanCodeError};
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;
use tokio::io::AsyncBufRead;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManualEntryError {
    /// Rejected locally; nothing was sent
    #[error(transparent)]
    Invalid(#[from] ScanCodeError),
}

/// Holds the manual entry form for one named container
#[derive(Debug)]
pub struct ManualEntryHost {
    container: String,
    form: OnceLock<Arc<ManualEntryForm>>,
}

impl ManualEntryHost {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            form: OnceLock::new(),
        }
    }

    /// Attach the form, or return the one already attached.
    ///
    /// `build` only runs for the first attach.
    pub fn attach<F>(&self, build: F) -> Arc<ManualEntryForm>
    where
        F: FnOnce() -> ManualEntryForm,
    {
        let mut created = false;
        let form = self.form.get_or_init(|| {
            created = true;
            Arc::new(build())
        });

        if created {
            tracing::info!("Manual entry form attached to #{}", self.container);
        } else {
            tracing::debug!("Manual entry form already present in #{}", self.container);
        }

        Arc::clone(form)
    }

    pub fn form(&self) -> Option<Arc<ManualEntryForm>> {
        self.form.get().cloned()
    }

    pub fn is_attached(&self) -> bool {
        self.form.get().is_some()
    }

    pub fn container(&self) -> &str {
        &self.container
    }
}

/// Runs after a manual lookup has opened the details view
pub type NavigationHook = Box<dyn Fn() + Send + Sync>;

/// Numeric input plus submit
pub struct ManualEntryForm {
    input: Mutex<String>,
    flow: LookupFlow,
    max_code_length: usize,
    on_navigated: Option<NavigationHook>,
}

impl std::fmt::Debug for ManualEntryForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualEntryForm")
            .field("input", &self.input())
            .field("max_code_length", &self.max_code_length)
            .finish_non_exhaustive()
    }
}

impl ManualEntryForm {
    pub fn new(flow: LookupFlow, max_code_length: usize) -> Self {
        Self {
            input: Mutex::new(String::new()),
            flow,
            max_code_length,
            on_navigated: None,
        }
    }

    /// Call `hook` once a submission has navigated to the details view
    pub fn with_navigation_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_navigated = Some(Box::new(hook));
        self
    }

    /// Replace the input field contents
    pub fn set_input(&self, text: &str) {
        *self.input.lock().unwrap() = text.to_string();
    }

    pub fn input(&self) -> String {
        self.input.lock().unwrap().clone()
    }

    /// Submit the current input.
    ///
    /// Invalid input shows a local error and makes no network call. Valid input clears
    /// the field, then runs the lookup flow. A lookup that navigates runs the navigation
    /// hook before returning.
    pub async fn submit(&self) -> Result<FlowOutcome, ManualEntryError> {
        let raw = self.input();

        let code = match ScanCode::parse(&raw, self.max_code_length) {
            Ok(code) => code,
            Err(e) => {
                tracing::debug!("Manual entry rejected {:?}: {}", raw, e);
                self.flow.metrics().record_manual_rejection();
                self.flow.feedback().show_error(&e.to_string());
                return Err(e.into());
            }
        };

        self.input.lock().unwrap().clear();
        self.flow.metrics().record_manual_submission();
        tracing::info!("Manual entry submitted {}", code);

        let outcome = self.flow.run(&code).await;

        if let (FlowOutcome::Navigated { .. }, Some(hook)) = (&outcome, &self.on_navigated) {
            hook();
        }

        Ok(outcome)
    }

    /// Type `text` into the field and submit it
    pub async fn submit_code(&self, text: &str) -> Result<FlowOutcome, ManualEntryError> {
        self.set_input(text);
        self.submit().await
    }

    /// Submit each line of `reader` until a lookup navigates or the input ends.
    ///
    /// Rejected and failed submissions are already on screen, so reading just goes on.
    ///
    /// # Returns
    /// The navigating outcome, or `None` if the input ended first
    pub async fn read_lines<R>(&self, mut reader: R) -> Option<FlowOutcome>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            let text = match next_scanner_line(&mut reader, &mut buf).await {
                Ok(ScannerLine::Text(text)) => text,
                Ok(ScannerLine::Unreadable) => {
                    tracing::debug!("Ignoring unreadable manual entry line");
                    continue;
                }
                Ok(ScannerLine::Closed) => {
                    tracing::info!("Manual entry input closed");
                    return None;
                }
                Err(e) => {
                    tracing::warn!("Failed to read manual entry input: {}", e);
                    return None;
                }
            };

            if let Ok(outcome @ FlowOutcome::Navigated { .. }) = self.submit_code(&text).await {
                return Some(outcome);
            }
        }
    }
}
