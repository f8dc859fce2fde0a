//! In-memory [PageSource] for tests. Unknown URLs answer HTTP 404.

use super::{FetchError, PageSource};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    bodies: HashMap<String, Vec<u8>>,
    pub(crate) requests: Vec<String>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }
}

impl PageSource for FakeSource {
    fn get_bytes(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }
}
