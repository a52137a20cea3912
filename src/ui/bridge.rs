// FeedbackBridge - Moves feedback updates off the session task onto a renderer task
//
// The session, the lookup flow and manual entry all report through a FeedbackSurface.
// When the actual display is slow (a terminal, a remote page) those calls should not block
// the scan loop, so the bridge queues them and a single renderer task applies them in order.

use super::feedback::{FeedbackState, FeedbackSurface, FeedbackUpdate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Queue capacity. Updates beyond this are dropped with a warning instead of growing memory.
pub const FEEDBACK_QUEUE_CAPACITY: usize = 100;

/// Queues feedback updates for a renderer task
///
/// The renderer owns the [`FeedbackState`], applies every update to it, and hands the
/// result to a render callback. When every bridge handle is dropped the renderer drains
/// the queue and finishes with the final state.
///
/// # Example
/// ```ignore
/// let (bridge, renderer) = FeedbackBridge::spawn(&tokio::runtime::Handle::current(), |state| {
///     if let Some(error) = &state.error {
///         eprintln!("{error}");
///     }
/// });
/// bridge.show_status("Ready to scan");
/// drop(bridge);
/// let last = renderer.await?;
/// ```
#[derive(Clone)]
pub struct FeedbackBridge {
    update_tx: mpsc::Sender<FeedbackUpdate>,
}

impl FeedbackBridge {
    /// Create a bridge and spawn its renderer task
    ///
    /// # Arguments
    /// * `tokio_handle` - Runtime the renderer task runs on
    /// * `render` - Called with the display state after each applied update
    ///
    /// # Returns
    /// The bridge and the renderer's handle, which resolves to the last display state
    pub fn spawn<F>(
        tokio_handle: &tokio::runtime::Handle,
        mut render: F,
    ) -> (Self, JoinHandle<FeedbackState>)
    where
        F: FnMut(&FeedbackState) + Send + 'static,
    {
        let (update_tx, mut update_rx) = mpsc::channel::<FeedbackUpdate>(FEEDBACK_QUEUE_CAPACITY);

        let renderer = tokio_handle.spawn(async move {
            tracing::debug!("Feedback renderer started");

            let mut state = FeedbackState::default();
            while let Some(update) = update_rx.recv().await {
                state.apply(update);
                render(&state);
            }

            tracing::debug!("Feedback renderer terminated");
            state
        });

        (Self { update_tx }, renderer)
    }

    fn send(&self, update: FeedbackUpdate) {
        match self.update_tx.try_send(update) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Feedback queue full - skipping update to prevent backpressure");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Failed to send feedback update - renderer has stopped");
            }
        }
    }
}

impl FeedbackSurface for FeedbackBridge {
    fn show_status(&self, text: &str) {
        self.send(FeedbackUpdate::Status(text.to_string()));
    }

    fn show_error(&self, text: &str) {
        self.send(FeedbackUpdate::Error(text.to_string()));
    }

    fn show_loading(&self, loading: bool) {
        self.send(FeedbackUpdate::Loading(loading));
    }
}
