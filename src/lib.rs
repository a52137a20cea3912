// rental-scan - QR scan station for event rental check-in and check-out
//
// This is the library crate containing the scan workflow: decoder seam, session state
// machine, lookup client and operator feedback. The binary crate (main.rs) wires them to
// a keyboard-wedge scanner on stdin and a console display.

pub mod config;
pub mod decoder;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use decoder::{Decoder, DecoderEvent, KeyboardWedgeDecoder};
pub use metrics::ScanMetrics;
pub use models::{AppConfig, LookupOutcome, ScanCode, SessionState};
pub use services::{HttpTransport, LookupClient, RentalClient, TransportError};
pub use state::{StateChange, StateManager};
pub use ui::{FeedbackBridge, FeedbackSurface, ScanSession};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Directory holding `scanner.yaml`, relative to the working directory
pub const CONFIG_DIR: &str = "RentalScan Data";
