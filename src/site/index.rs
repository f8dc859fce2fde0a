//! Index page extraction: title, author, and the chapter directory.
//!
//! Misses never fail: metadata falls back to sentinel strings, the directory to fewer entries.

use super::{FetchError, PageSource, SiteProfile};
use crate::model::{
    ChapterRef, IndexListing, MangaMetadata, UNKNOWN_AUTHOR, UNKNOWN_CHAPTER, UNKNOWN_TITLE,
};
use log::warn;
use scraper::{Html, Selector};

/// Trimmed text of the first match, if any and non-empty.
fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn extract_title(doc: &Html, profile: &SiteProfile) -> String {
    first_text(doc, &profile.title).unwrap_or_else(|| {
        warn!("Comic title not found on index page; using {:?}", UNKNOWN_TITLE);
        UNKNOWN_TITLE.to_string()
    })
}

pub fn extract_author(doc: &Html, profile: &SiteProfile) -> String {
    first_text(doc, &profile.author).unwrap_or_else(|| {
        warn!("Comic author not found on index page; using {:?}", UNKNOWN_AUTHOR);
        UNKNOWN_AUTHOR.to_string()
    })
}

pub fn extract_metadata(doc: &Html, profile: &SiteProfile) -> MangaMetadata {
    MangaMetadata {
        title: extract_title(doc, profile),
        author: extract_author(doc, profile),
    }
}

/// Chapter links in document order. Links without a target are skipped; a missing label
/// becomes [UNKNOWN_CHAPTER].
pub fn extract_chapters(doc: &Html, profile: &SiteProfile) -> Vec<ChapterRef> {
    let mut chapters = Vec::new();
    for link in doc.select(&profile.chapter_link) {
        let url = match link.value().attr("href").and_then(|h| profile.resolve(h)) {
            Some(u) => u,
            None => continue,
        };
        let title = link
            .select(&profile.chapter_label)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_else(|| UNKNOWN_CHAPTER.to_string());
        chapters.push(ChapterRef { title, url });
    }
    if chapters.is_empty() {
        warn!("No chapter links found on index page");
    }
    chapters
}

/// Fetch the index page once and extract metadata and the chapter directory from it.
pub fn fetch_index(
    source: &mut dyn PageSource,
    index_url: &str,
    profile: &SiteProfile,
) -> Result<IndexListing, FetchError> {
    let doc = source.get_document(index_url)?;
    Ok(IndexListing {
        metadata: extract_metadata(&doc, profile),
        chapters: extract_chapters(&doc, profile),
    })
}
