//! Data model for a downloaded comic: metadata, chapter directory, and image references.
//!
//! Extractors produce these; the downloader, EPUB writer, and orchestrator consume them.

use serde::Serialize;
use std::path::PathBuf;

/// Returned by the metadata extractor when the title locator finds nothing.
pub const UNKNOWN_TITLE: &str = "unknown title";
/// Returned by the metadata extractor when the author locator finds nothing.
pub const UNKNOWN_AUTHOR: &str = "unknown author";
/// Label for a chapter link that has no nested label element.
pub const UNKNOWN_CHAPTER: &str = "unknown chapter";

/// Comic-level metadata from the index page. Used for output naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MangaMetadata {
    pub title: String,
    pub author: String,
}

impl MangaMetadata {
    /// Metadata used when the index page itself could not be fetched.
    pub fn unknown() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
        }
    }

    /// Output directory name: `<title> - <author>`, with filesystem-reserved characters removed.
    pub fn directory_name(&self) -> String {
        crate::naming::strip_reserved(&format!("{} - {}", self.title, self.author))
    }
}

/// One entry of the chapter directory, in index-page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRef {
    pub title: String,
    /// Absolute URL of the chapter's first page.
    pub url: String,
}

/// An image after download: where it came from and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub url: String,
    pub path: PathBuf,
}

/// Index page listing produced by `--dry-run`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexListing {
    #[serde(flatten)]
    pub metadata: MangaMetadata,
    pub chapters: Vec<ChapterRef>,
}
