// Feedback surface - the passive sink for operator-facing messages
//
// Nothing here decides anything. The session and the lookup flow call into a surface;
// the surface only keeps the three display slots consistent.

use std::sync::Mutex;

/// Where status, error and loading indicators are shown.
///
/// Implementations must keep one rule: showing a status clears the current error.
pub trait FeedbackSurface: Send + Sync {
    fn show_status(&self, text: &str);
    fn show_error(&self, text: &str);
    fn show_loading(&self, loading: bool);
}

/// A single display change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackUpdate {
    Status(String),
    Error(String),
    Loading(bool),
}

/// What the operator currently sees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackState {
    pub status: Option<String>,
    pub error: Option<String>,
    pub loading: bool,
}

impl FeedbackState {
    /// Apply one update.
    ///
    /// Status and error banners are mutually exclusive; the loading spinner is independent.
    pub fn apply(&mut self, update: FeedbackUpdate) {
        match update {
            FeedbackUpdate::Status(text) => {
                self.status = Some(text);
                self.error = None;
            }
            FeedbackUpdate::Error(text) => {
                self.error = Some(text);
                self.status = None;
            }
            FeedbackUpdate::Loading(loading) => self.loading = loading,
        }
    }
}

/// In-memory feedback surface
#[derive(Debug, Default)]
pub struct FeedbackPanel {
    state: Mutex<FeedbackState>,
}

impl FeedbackPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FeedbackState {
        self.state.lock().unwrap().clone()
    }

    fn apply(&self, update: FeedbackUpdate) {
        self.state.lock().unwrap().apply(update);
    }
}

impl FeedbackSurface for FeedbackPanel {
    fn show_status(&self, text: &str) {
        self.apply(FeedbackUpdate::Status(text.to_string()));
    }

    fn show_error(&self, text: &str) {
        self.apply(FeedbackUpdate::Error(text.to_string()));
    }

    fn show_loading(&self, loading: bool) {
        self.apply(FeedbackUpdate::Loading(loading));
    }
}
