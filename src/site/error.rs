//! Error types for fetching pages and building the site profile.

use thiserror::Error;

/// Failure to fetch one URL. Always carries the URL that was requested.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Invalid locator table or origin. Raised once, before any page is fetched.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid {field} selector {selector:?}: {reason}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("Invalid site origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },
}
