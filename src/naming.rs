//! Filesystem-safe names for chapter directories and archives.

use crate::model::UNKNOWN_CHAPTER;
use std::collections::HashSet;

/// Characters reserved by common filesystems.
const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Remove reserved characters, keeping whitespace as-is.
pub fn strip_reserved(name: &str) -> String {
    name.chars().filter(|c| !RESERVED.contains(c)).collect()
}

/// Remove reserved characters and collapse each whitespace run into a single `_`.
pub fn slugify(title: &str) -> String {
    let stripped = strip_reserved(title);
    let mut out = String::with_capacity(stripped.len());
    let mut in_space = false;
    for c in stripped.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Slug used as a single path component. Slugs that are empty or name the current or parent
/// directory fall back to the slug of [UNKNOWN_CHAPTER].
pub fn chapter_slug(title: &str) -> String {
    let slug = slugify(title.trim());
    match slug.as_str() {
        "" | "." | ".." => slugify(UNKNOWN_CHAPTER),
        _ => slug,
    }
}

/// Chapter slugs handed out during one run. A repeated slug gets `_2`, `_3`, ... appended
/// in chapter order, so every chapter keeps its own image directory and archive.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    pub fn claim(&mut self, title: &str) -> String {
        let base = chapter_slug(title);
        let mut slug = base.clone();
        let mut n = 2;
        while !self.used.insert(slug.clone()) {
            slug = format!("{}_{}", base, n);
            n += 1;
        }
        slug
    }
}
