//! Data models for the rental scan station.
//!
//! - [`ScanCode`]: the normalized digit string that identifies a customer's rental
//! - [`CustomerSummary`] / [`RentalStatus`]: what a successful lookup returns
//! - [`SessionState`] / [`SessionSnapshot`]: the in-memory scan session, owned by
//!   [`StateManager`](crate::state::StateManager)
//! - [`AppConfig`]: station configuration, loaded by [`ConfigManager`](crate::config::ConfigManager)
//!
//! Customer, rental and QR records themselves live in the backend database. This crate only
//! ever holds a code and the summary the backend sends back for it.

pub mod config;
pub mod scan;
pub mod session_state;

pub use config::{
    AppConfig, ConfigError, DECODER_CONFIG_VERSION, DecoderConfig, LoggingConfig,
    ManualEntryConfig, PageContainers, ServerConfig, TimingConfig,
};
pub use scan::{
    CustomerSummary, DEFAULT_MAX_CODE_LENGTH, LookupOutcome, NOMINAL_CODE_LENGTH, RentalStatus,
    ScanCode, ScanCodeError,
};
pub use session_state::{SessionSnapshot, SessionState};
