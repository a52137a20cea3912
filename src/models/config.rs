use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::scan::DEFAULT_MAX_CODE_LENGTH;

/// Current layout of [`DecoderConfig`]. Bump when fields change meaning.
pub const DECODER_CONFIG_VERSION: u32 = 1;

/// Station configuration loaded from `scanner.yaml` and `RENTAL_SCAN_*` variables.
///
/// Every field has a default so a missing or partial file still yields a working station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub decoder: DecoderConfig,
    pub timing: TimingConfig,
    pub manual_entry: ManualEntryConfig,
    pub containers: PageContainers,
    pub logging: LoggingConfig,
}

/// Backend endpoints and transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub lookup_path: String,
    pub details_path: String,
    pub health_path: String,
    pub request_timeout_secs: u64,

    /// The backend ships with a self-signed certificate on the venue network
    pub accept_invalid_certs: bool,

    /// Value of the `session` cookie from a logged-in staff account
    pub session_cookie: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:5000".to_string(),
            lookup_path: "/api/verify-qr".to_string(),
            details_path: "/lookup".to_string(),
            health_path: "/health".to_string(),
            request_timeout_secs: 10,
            accept_invalid_certs: false,
            session_cookie: None,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Fixed decoder settings, checked once at startup.
///
/// Fields a decoder cannot honour are switched off by [`DecoderConfig::validate`] instead of
/// being probed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub version: u32,
    pub fps: u32,
    pub qrbox_width: u32,
    pub qrbox_height: u32,
    pub aspect_ratio: f64,
    pub remember_last_camera: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            version: DECODER_CONFIG_VERSION,
            fps: 10,
            qrbox_width: 250,
            qrbox_height: 250,
            aspect_ratio: 1.0,
            remember_last_camera: true,
        }
    }
}

/// Pacing delays. None of them can be cancelled once started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait before scanning again after an error, so the label can leave the frame
    pub resume_delay_ms: u64,

    /// How long the "Found: ..." status stays up before navigating
    pub navigation_delay_ms: u64,

    pub visibility_resume_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resume_delay_ms: 2000,
            navigation_delay_ms: 1000,
            visibility_resume_delay_ms: 500,
        }
    }
}

impl TimingConfig {
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }

    pub fn visibility_resume_delay(&self) -> Duration {
        Duration::from_millis(self.visibility_resume_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualEntryConfig {
    pub max_code_length: usize,
}

impl Default for ManualEntryConfig {
    fn default() -> Self {
        Self {
            max_code_length: DEFAULT_MAX_CODE_LENGTH,
        }
    }
}

/// Names of the page regions the scan workflow renders into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContainers {
    pub video_region: String,
    pub manual_entry: String,
    pub error_banner: String,
    pub status_banner: String,
    pub loading_spinner: String,
}

impl Default for PageContainers {
    fn default() -> Self {
        Self {
            video_region: "qr-reader".to_string(),
            manual_entry: "manual-entry".to_string(),
            error_banner: "error-message".to_string(),
            status_banner: "status-message".to_string(),
            loading_spinner: "loading".to_string(),
        }
    }
}

impl PageContainers {
    /// All five containers must be named, and no two may share a name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("video_region", &self.video_region),
            ("manual_entry", &self.manual_entry),
            ("error_banner", &self.error_banner),
            ("status_banner", &self.status_banner),
            ("loading_spinner", &self.loading_spinner),
        ];

        for (role, name) in &named {
            if name.trim().is_empty() {
                return Err(ConfigError::MissingContainer(role.to_string()));
            }
        }

        for (i, (role, name)) in named.iter().enumerate() {
            if let Some((other, _)) = named[i + 1..].iter().find(|(_, n)| n == name) {
                return Err(ConfigError::DuplicateContainer {
                    name: name.to_string(),
                    first: role.to_string(),
                    second: other.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: Utf8PathBuf,
    pub log_prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: Utf8PathBuf::from("logs"),
            log_prefix: "rental-scan".to_string(),
            debug: false,
            console: true,
        }
    }
}

/// Configuration values that cannot be used as given.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported decoder config version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Decoder setting {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("Page container for {0} is not named")]
    MissingContainer(String),

    #[error("Page container {name:?} is used for both {first} and {second}")]
    DuplicateContainer {
        name: String,
        first: String,
        second: String,
    },
}
