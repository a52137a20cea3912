//! Decoder seam.
//!
//! The actual frame sampling and QR decoding belong to a third-party component. This module
//! only fixes the contract the scan session drives it through:
//!
//! - [`Decoder::start`] opens the camera (or other source) and hands back a channel of
//!   [`DecoderEvent`]s
//! - [`Decoder::pause`] / [`Decoder::resume`] gate event delivery and must be idempotent
//! - [`Decoder::stop`] releases the device and must be safe to call more than once
//!
//! Each decoder declares what it supports up front through [`DecoderCapabilities`];
//! [`DecoderConfig::validate`] applies that declaration once at startup.

pub mod wedge;

pub use wedge::{KeyboardWedgeDecoder, ScannerLine, next_scanner_line};

use crate::models::{ConfigError, DECODER_CONFIG_VERSION, DecoderConfig};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Events a running decoder emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// Raw decoded payload, not yet normalized
    Decoded(String),

    /// Frame without a readable code. Expected noise, never shown to the operator.
    DecodeFailure(String),
}

/// Static feature declaration of a decoder implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderCapabilities {
    pub max_fps: u32,
    pub remember_last_camera: bool,
}

impl Default for DecoderCapabilities {
    fn default() -> Self {
        Self {
            max_fps: 60,
            remember_last_camera: true,
        }
    }
}

/// Why a decoder could not start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    #[error("QR decoder library is not available")]
    LibraryUnavailable,

    #[error("No camera found")]
    NoCamera,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera scanning is not supported on this platform")]
    Unsupported,

    #[error("Decoder failed to start: {0}")]
    Failed(String),
}

/// A source of decoded scan payloads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Decoder: Send + Sync {
    fn capabilities(&self) -> DecoderCapabilities;

    /// Start sampling. Events stop when the returned channel closes.
    async fn start(
        &self,
        config: &DecoderConfig,
    ) -> Result<mpsc::Receiver<DecoderEvent>, DecoderError>;

    fn pause(&self);

    fn resume(&self);

    fn stop(&self);
}

const QRBOX_RANGE: std::ops::RangeInclusive<u32> = 50..=1000;
const MAX_ASPECT_RATIO: f64 = 4.0;

impl DecoderConfig {
    /// Check this config against a decoder's capabilities and return the config to start with.
    ///
    /// Out-of-range values are errors. Features the decoder declares unsupported are turned off.
    pub fn validate(&self, capabilities: &DecoderCapabilities) -> Result<Self, ConfigError> {
        if self.version != DECODER_CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                expected: DECODER_CONFIG_VERSION,
            });
        }

        if self.fps == 0 || self.fps > capabilities.max_fps {
            return Err(ConfigError::OutOfRange {
                field: "fps",
                value: self.fps.to_string(),
            });
        }

        if !QRBOX_RANGE.contains(&self.qrbox_width) {
            return Err(ConfigError::OutOfRange {
                field: "qrbox_width",
                value: self.qrbox_width.to_string(),
            });
        }

        if !QRBOX_RANGE.contains(&self.qrbox_height) {
            return Err(ConfigError::OutOfRange {
                field: "qrbox_height",
                value: self.qrbox_height.to_string(),
            });
        }

        if !self.aspect_ratio.is_finite()
            || self.aspect_ratio <= 0.0
            || self.aspect_ratio > MAX_ASPECT_RATIO
        {
            return Err(ConfigError::OutOfRange {
                field: "aspect_ratio",
                value: self.aspect_ratio.to_string(),
            });
        }

        let mut effective = self.clone();

        if effective.remember_last_camera && !capabilities.remember_last_camera {
            tracing::warn!("Decoder cannot remember the last camera, setting ignored");
            effective.remember_last_camera = false;
        }

        Ok(effective)
    }
}
