//! Orchestration: index page once, then paginate, download, and package every chapter in order.
//!
//! Errors stop at the chapter boundary. A failed chapter is logged and the next one starts.

use crate::download::{download_all, DownloadError};
use crate::epub::{write_chapter_archive, EpubError};
use crate::model::{ChapterRef, IndexListing, MangaMetadata};
use crate::naming::{chapter_slug, SlugRegistry};
use crate::site::index::fetch_index;
use crate::site::pages::{collect_chapter_images, DEFAULT_MAX_PAGES};
use crate::site::{PageSource, SiteProfile};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory under the comic's output directory that holds per-chapter image folders.
pub const TEMP_IMAGES_DIR: &str = "temp_images";

/// Options for a run: where to write, how far to paginate, and an optional progress callback.
pub struct RunOptions<'a> {
    /// Base directory; the comic's `<title> - <author>` directory is created inside it.
    pub output_base: PathBuf,
    pub max_pages: usize,
    /// Called before each chapter with (chapter number, chapter count).
    pub progress: Option<&'a dyn Fn(u32, u32)>,
}

impl Default for RunOptions<'_> {
    fn default() -> Self {
        Self {
            output_base: PathBuf::from("."),
            max_pages: DEFAULT_MAX_PAGES,
            progress: None,
        }
    }
}

/// Counters for one run. Summarised by the caller; never turned into a failure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub metadata: Option<MangaMetadata>,
    pub output_dir: Option<PathBuf>,
    pub chapters_found: usize,
    pub archives_written: usize,
    pub chapters_failed: usize,
    pub images_written: usize,
}

/// Why a chapter produced no archive.
#[derive(Debug, Error)]
pub enum ChapterError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Epub(#[from] EpubError),
}

/// Result of one successfully packaged chapter.
#[derive(Debug)]
struct ChapterOutcome {
    archive: PathBuf,
    images: usize,
}

/// Download the comic at `index_url` and write one EPUB per chapter. Always returns a report.
pub fn run(
    index_url: &str,
    source: &mut dyn PageSource,
    profile: &SiteProfile,
    options: &RunOptions<'_>,
) -> RunReport {
    let listing = match fetch_index(source, index_url, profile) {
        Ok(listing) => listing,
        Err(e) => {
            error!("Failed to fetch index page: {}", e);
            IndexListing {
                metadata: MangaMetadata::unknown(),
                chapters: Vec::new(),
            }
        }
    };
    let IndexListing { metadata, chapters } = listing;
    info!("Comic title: {}", metadata.title);
    info!("Comic author: {}", metadata.author);

    let output_dir = options.output_base.join(metadata.directory_name());
    let mut report = RunReport {
        chapters_found: chapters.len(),
        ..RunReport::default()
    };

    if chapters.is_empty() {
        info!("No chapters found; nothing to do");
        report.metadata = Some(metadata);
        return report;
    }

    let total = chapters.len() as u32;
    let mut slugs = SlugRegistry::default();
    for (i, chapter) in chapters.iter().enumerate() {
        let n = i as u32 + 1;
        if let Some(progress) = options.progress {
            progress(n, total);
        }
        debug!("Chapter {}/{}: {}", n, total, chapter.title);
        let slug = slugs.claim(&chapter.title);
        if slug != chapter_slug(&chapter.title) {
            warn!(
                "Chapter {:?} has the same file name as an earlier chapter; writing it as {}",
                chapter.title, slug
            );
        }
        match process_chapter(chapter, &slug, &metadata, &output_dir, source, profile, options) {
            Ok(outcome) => {
                report.archives_written += 1;
                report.images_written += outcome.images;
                debug!(
                    "Chapter {:?}: {} image(s) -> {}",
                    chapter.title,
                    outcome.images,
                    outcome.archive.display()
                );
            }
            Err(e) => {
                report.chapters_failed += 1;
                error!("Chapter {:?} failed: {}", chapter.title, e);
            }
        }
    }

    report.metadata = Some(metadata);
    report.output_dir = Some(output_dir);
    report
}

/// Per-chapter image directory: `<output>/temp_images/<slug>`.
pub fn chapter_image_dir(output_dir: &Path, slug: &str) -> PathBuf {
    output_dir.join(TEMP_IMAGES_DIR).join(slug)
}

fn process_chapter(
    chapter: &ChapterRef,
    slug: &str,
    metadata: &MangaMetadata,
    output_dir: &Path,
    source: &mut dyn PageSource,
    profile: &SiteProfile,
    options: &RunOptions<'_>,
) -> Result<ChapterOutcome, ChapterError> {
    let image_dir = chapter_image_dir(output_dir, slug);
    let urls = collect_chapter_images(&chapter.url, source, profile, options.max_pages);
    if urls.is_empty() {
        warn!("Chapter {:?}: no images found at {}", chapter.title, chapter.url);
    }
    let images = download_all(&urls, &image_dir, source)?;
    let paths: Vec<PathBuf> = images.into_iter().map(|i| i.path).collect();
    let archive = write_chapter_archive(metadata, &chapter.title, slug, &paths, output_dir)?;
    Ok(ChapterOutcome {
        archive,
        images: paths.len(),
    })
}
