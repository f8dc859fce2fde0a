//! Chapter pagination: follow the next-page control from the first page, collecting image URLs
//! in reading order.

use super::{PageSource, SiteProfile};
use log::{debug, error, warn};
use scraper::Html;
use std::collections::HashSet;

/// Default bound on pages followed for one chapter.
pub const DEFAULT_MAX_PAGES: usize = 500;

/// Image URLs on one page, in document order. The lazy-load attribute wins over the standard one;
/// elements carrying neither are skipped.
pub fn extract_image_urls(doc: &Html, profile: &SiteProfile) -> Vec<String> {
    doc.select(&profile.image)
        .filter_map(|img| {
            let el = img.value();
            el.attr(&profile.image_lazy_attr)
                .or_else(|| el.attr(&profile.image_attr))
        })
        .filter_map(|src| profile.resolve(src))
        .collect()
}

/// Absolute URL of the next page, if the page has a next-page control with a link target.
pub fn find_next_page(doc: &Html, profile: &SiteProfile) -> Option<String> {
    let control = doc
        .select(&profile.next_link)
        .find(|a| a.text().collect::<String>().trim() == profile.next_label)?;
    control
        .value()
        .attr("href")
        .and_then(|href| profile.resolve(href))
}

/// Walk a chapter from `first_url` and return every image URL across its pages.
///
/// A failed page fetch ends the walk and keeps what was already collected. The walk also stops
/// when a next-page link points at a page already visited, or after `max_pages` pages.
pub fn collect_chapter_images(
    first_url: &str,
    source: &mut dyn PageSource,
    profile: &SiteProfile,
    max_pages: usize,
) -> Vec<String> {
    let mut images = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = Some(first_url.to_string());

    while let Some(url) = current.take() {
        if visited.len() >= max_pages {
            warn!(
                "Stopped after {} pages at {}; remaining pages not followed",
                max_pages, url
            );
            break;
        }
        let doc = match source.get_document(&url) {
            Ok(doc) => doc,
            Err(e) => {
                error!("Failed to fetch chapter page: {}", e);
                break;
            }
        };
        visited.insert(url.clone());

        let page_images = extract_image_urls(&doc, profile);
        debug!("{}: {} image(s)", url, page_images.len());
        images.extend(page_images);

        current = match find_next_page(&doc, profile) {
            Some(next) if visited.contains(&next) => {
                warn!("Next-page link at {} loops back to {}; stopping", url, next);
                None
            }
            next => next,
        };
    }
    images
}
