//! Image downloader. Writes each fetched image as `NNN.jpg` into a chapter's image directory.
//!
//! Numbers are assigned to successful writes only, so the files on disk are always `001..N`
//! with no gaps, whatever failed in between.

use crate::model::ImageRef;
use crate::site::PageSource;
use log::{debug, error};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Cannot create image directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name for the `index`-th written image (1-based).
pub fn image_file_name(index: usize) -> String {
    format!("{:03}.jpg", index)
}

/// Fetch every URL in order and write the bodies under `output_dir`.
///
/// Per-image fetch or write failures are logged and skipped. Returns the written images in
/// write order. Fails only when `output_dir` cannot be created.
pub fn download_all(
    urls: &[String],
    output_dir: &Path,
    source: &mut dyn PageSource,
) -> Result<Vec<ImageRef>, DownloadError> {
    std::fs::create_dir_all(output_dir).map_err(|e| DownloadError::CreateDir {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let mut written: Vec<ImageRef> = Vec::with_capacity(urls.len());
    for url in urls {
        let bytes = match source.get_bytes(url) {
            Ok(b) => b,
            Err(e) => {
                error!("Image download failed, skipped: {}", e);
                continue;
            }
        };
        let path = output_dir.join(image_file_name(written.len() + 1));
        if let Err(e) = std::fs::write(&path, &bytes) {
            error!("Cannot write image {} ({}): {}. Skipped.", path.display(), url, e);
            continue;
        }
        debug!("{} -> {}", url, path.display());
        written.push(ImageRef {
            url: url.clone(),
            path,
        });
    }
    Ok(written)
}
