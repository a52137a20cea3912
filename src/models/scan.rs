use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Longest code the backend has ever issued or accepted.
pub const DEFAULT_MAX_CODE_LENGTH: usize = 10;

/// Length of the codes printed on customer QR labels.
pub const NOMINAL_CODE_LENGTH: usize = 4;

/// Matches a details link such as `https://host/lookup?qr_code=1234`.
static DETAILS_LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]qr_code=(\d+)").expect("Invalid details link regex"));

/// Reasons a string is not a usable scan code.
///
/// The `Display` text is what operators see, so keep it short and actionable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanCodeError {
    #[error("Please enter a QR code")]
    Empty,

    #[error("QR code should contain only numbers")]
    NonDigit,

    #[error("QR code must be at most {max} digits")]
    TooLong { max: usize },
}

/// A normalized scan code: a non-empty, length-bounded string of ASCII digits.
///
/// Scan codes are the only thing this crate knows about a customer record; everything
/// else lives behind the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ScanCode(String);

impl ScanCode {
    /// Validate operator or decoder input.
    ///
    /// Surrounding whitespace is ignored. Leading zeros are significant (`0042` is not `42`).
    pub fn parse(input: &str, max_len: usize) -> Result<Self, ScanCodeError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(ScanCodeError::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScanCodeError::NonDigit);
        }
        if trimmed.len() > max_len {
            return Err(ScanCodeError::TooLong { max: max_len });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Normalize a raw decoder payload into a scan code.
    ///
    /// Labels normally encode the bare digits, but a label that encodes the details link
    /// yields the code embedded in its query string.
    pub fn normalize_payload(raw: &str, max_len: usize) -> Result<Self, ScanCodeError> {
        let trimmed = raw.trim();

        if let Some(captures) = DETAILS_LINK_PATTERN.captures(trimmed) {
            return Self::parse(&captures[1], max_len);
        }

        Self::parse(trimmed, max_len)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScanCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rental lifecycle stage as tracked by the backend.
///
/// The backend owns this value; it arrives as a bare integer and is only displayed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum RentalStatus {
    NotActive,
    Active,
    Returned,
    Unknown(i64),
}

impl RentalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RentalStatus::NotActive => "Not Active",
            RentalStatus::Active => "Active Rental",
            RentalStatus::Returned => "Returned",
            RentalStatus::Unknown(_) => "Unknown Status",
        }
    }
}

impl From<i64> for RentalStatus {
    fn from(value: i64) -> Self {
        match value {
            0 => RentalStatus::NotActive,
            1 => RentalStatus::Active,
            2 => RentalStatus::Returned,
            other => RentalStatus::Unknown(other),
        }
    }
}

impl From<RentalStatus> for i64 {
    fn from(status: RentalStatus) -> Self {
        match status {
            RentalStatus::NotActive => 0,
            RentalStatus::Active => 1,
            RentalStatus::Returned => 2,
            RentalStatus::Unknown(other) => other,
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Customer fields returned by a successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub first_name: String,
    pub last_name: String,
    pub rental_status: RentalStatus,

    #[serde(default)]
    pub user_id: Option<u64>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub qr_code_number: Option<String>,
}

impl CustomerSummary {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Status line shown before navigating to the details view.
    pub fn found_message(&self) -> String {
        format!("Found: {} ({})", self.display_name(), self.rental_status)
    }
}

/// Logical result of a lookup that reached the backend and got a well-formed answer.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(CustomerSummary),
    NotFound { reason: String },
}
