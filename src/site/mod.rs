//! Site access and extraction. Fetch seam, shared session, locator table, and extractors.

mod client;
mod error;

pub mod index;
pub mod pages;
pub mod profile;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{Session, SessionBuilder};
pub use error::{FetchError, ProfileError};
pub use profile::{Locators, SiteProfile, DEFAULT_ORIGIN};

use scraper::Html;

/// Source of page and image bytes. Implemented by [Session]; tests use an in-memory map.
pub trait PageSource {
    /// GET `url` and return the body. Non-success statuses are errors.
    fn get_bytes(&mut self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// GET `url` and parse the body as an HTML document.
    fn get_document(&mut self, url: &str) -> Result<Html, FetchError> {
        let body = self.get_bytes(url)?;
        Ok(Html::parse_document(&String::from_utf8_lossy(&body)))
    }
}
