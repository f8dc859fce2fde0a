//! Site origin and locator table. Every structural query the extractors make is named here,
//! so retargeting to other markup is a config change rather than a code change.

use super::error::ProfileError;
use reqwest::Url;
use scraper::Selector;
use serde::Deserialize;

pub const DEFAULT_ORIGIN: &str = "https://www.baozimh.com";

/// Raw locator strings. Defaults match the comic site this tool was written for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Locators {
    /// Comic title on the index page.
    pub title: String,
    /// Comic author on the index page.
    pub author: String,
    /// One link per chapter in the index page directory.
    pub chapter_link: String,
    /// Label element nested inside a chapter link.
    pub chapter_label: String,
    /// Image elements on a chapter page.
    pub image: String,
    /// Lazy-load attribute, preferred over `image_attr` when present.
    pub image_lazy_attr: String,
    pub image_attr: String,
    /// Candidate elements for the next-page control.
    pub next_link: String,
    /// Exact visible text of the next-page control.
    pub next_label: String,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            title: "h1.comics-detail__title".to_string(),
            author: "h2.comics-detail__author".to_string(),
            chapter_link: "a.comics-chapters__item".to_string(),
            chapter_label: "span".to_string(),
            image: "img".to_string(),
            image_lazy_attr: "data-src".to_string(),
            image_attr: "src".to_string(),
            next_link: "a".to_string(),
            next_label: "點擊進入下一頁".to_string(),
        }
    }
}

/// Compiled locator table plus the origin that relative links resolve against.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    origin: Url,
    pub(crate) title: Selector,
    pub(crate) author: Selector,
    pub(crate) chapter_link: Selector,
    pub(crate) chapter_label: Selector,
    pub(crate) image: Selector,
    pub(crate) image_lazy_attr: String,
    pub(crate) image_attr: String,
    pub(crate) next_link: Selector,
    pub(crate) next_label: String,
}

/// Parse a CSS selector or return a profile error (avoids panics from Selector::parse).
fn parse_selector(field: &'static str, sel: &str) -> Result<Selector, ProfileError> {
    Selector::parse(sel).map_err(|e| ProfileError::InvalidSelector {
        field,
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

impl SiteProfile {
    pub fn new(origin: &str, locators: &Locators) -> Result<Self, ProfileError> {
        let origin_url = Url::parse(origin).map_err(|e| ProfileError::InvalidOrigin {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
        if origin_url.cannot_be_a_base() {
            return Err(ProfileError::InvalidOrigin {
                origin: origin.to_string(),
                reason: "URL cannot be used as a base for relative links".to_string(),
            });
        }
        Ok(Self {
            origin: origin_url,
            title: parse_selector("title", &locators.title)?,
            author: parse_selector("author", &locators.author)?,
            chapter_link: parse_selector("chapter_link", &locators.chapter_link)?,
            chapter_label: parse_selector("chapter_label", &locators.chapter_label)?,
            image: parse_selector("image", &locators.image)?,
            image_lazy_attr: locators.image_lazy_attr.clone(),
            image_attr: locators.image_attr.clone(),
            next_link: parse_selector("next_link", &locators.next_link)?,
            next_label: locators.next_label.clone(),
        })
    }

    /// Resolve a link target found in markup against the origin. Absolute targets pass through.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        self.origin.join(href).ok().map(|u| u.to_string())
    }
}
