//! comic2epub: download a serialized web comic and package each chapter as an EPUB.

pub mod cli;
pub mod config;
pub mod download;
pub mod epub;
pub mod model;
pub mod naming;
pub mod run;
pub mod site;

// Re-exports for CLI and consumers.
pub use download::{download_all, DownloadError};
pub use epub::{build_chapter_archive, EpubError};
pub use model::{ChapterRef, ImageRef, MangaMetadata};
pub use run::{run, RunOptions, RunReport};
pub use site::{FetchError, PageSource, ProfileError, Session, SessionBuilder, SiteProfile};
