//! Services module - backend calls for the scan station.
//!
//! Everything here is framework-agnostic: no feedback surface, no decoder, only requests to
//! the rental backend and the interpretation of its answers.
//!
//! # Components
//!
//! - [`BackendTransport`]: the network seam. [`HttpTransport`] implements it with `reqwest`;
//!   tests substitute their own.
//! - [`LookupClient`]: resolves a [`ScanCode`](crate::models::ScanCode) through the
//!   verification endpoint into a [`LookupOutcome`](crate::models::LookupOutcome) or a
//!   classified [`TransportError`].
//! - [`RentalClient`]: package check-in/check-out and the backend health probe.
//!
//! # Backend contract
//!
//! ```text
//! POST /api/verify-qr            {"qr_code": "1234"}
//!   200 {"success": true,  "user": {"first_name", "last_name", "rental_status": 0|1|2}}
//!   200 {"success": false, "error": "Invalid QR code"}
//! POST /api/package-action/<id>  {"action": "checkout_one" | "checkin_one" | ...}
//! GET  /health
//! ```
//!
//! Any non-2xx status from the verification endpoint is a transport failure, never a
//! logical "not found".

pub mod lookup;
pub mod rental;
pub mod transport;

pub use lookup::{DEFAULT_NOT_FOUND_REASON, LookupClient, parse_verify_response};
pub use rental::{
    HealthStatus, PackageAction, PackageActionResult, PackageSummary, RentalClient, RentalError,
};
pub use transport::{
    BackendTransport, HttpMethod, HttpTransport, TransportError, TransportFailure,
    TransportResponse, send_with_limit,
};
