use crate::models::ScanCode;

/// Leaves the scan screen for the details view of a verified code.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Build the details view URL for a code: `<base><details_path>?qr_code=<code>`
pub fn details_url(base_url: &str, details_path: &str, code: &ScanCode) -> String {
    let base = base_url.trim_end_matches('/');
    let path = details_path.trim_start_matches('/');
    format!("{}/{}?qr_code={}", base, path, code)
}

/// Prints the details URL on stdout for the operator to open
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &str) {
        tracing::info!("Navigating to {}", url);
        println!("Open customer details: {}", url);
    }
}
