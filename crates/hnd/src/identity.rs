//! Trusted identity extraction
//!
//! The reverse proxy in front of hnd authenticates the user and injects
//! their identity into a request header. This is the only place the
//! daemon looks at that header; the store crates never see transport
//! details and can be tested with synthetic identities.

use axum::http::HeaderMap;

/// Extract the proxy-asserted identity, or `None` if the header is
/// absent, empty, or not valid UTF-8. `None` means unauthenticated.
pub fn trusted_identity(headers: &HeaderMap, header_name: &str) -> Option<String> {
    let value = headers.get(header_name)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
