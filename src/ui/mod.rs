// UI module - scan session control and operator feedback
//
// This module contains:
// - ScanSession: owns the decoder and the session state machine
// - LookupFlow: shared lookup path for decoder reads and manual entry
// - ManualEntryForm / ManualEntryHost: the operator-typed fallback
// - FeedbackSurface, FeedbackPanel, FeedbackBridge: status, error and loading display
// - Navigator: leaves the scan screen for the details view

pub mod bridge;
pub mod controller;
pub mod feedback;
pub mod flow;
pub mod manual_entry;
pub mod navigation;

pub use bridge::{FEEDBACK_QUEUE_CAPACITY, FeedbackBridge};
pub use controller::{InitializationError, ScanSession};
pub use feedback::{FeedbackPanel, FeedbackState, FeedbackSurface, FeedbackUpdate};
pub use flow::{FlowOutcome, LookupFlow};
pub use manual_entry::{ManualEntryError, ManualEntryForm, ManualEntryHost};
pub use navigation::{ConsoleNavigator, Navigator, details_url};
