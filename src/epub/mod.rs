//! EPUB writer for one chapter: a single image-flow XHTML document plus its embedded images
//! (mimetype, container, OPF 3, nav, NCX, content document, images).

use crate::model::MangaMetadata;
use crate::naming::{chapter_slug, strip_reserved};
use log::{debug, error};
use std::collections::HashSet;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";
const CONTENT_DOC: &str = "chapter.xhtml";
const LANGUAGE: &str = "zh";
/// Images are declared as JPEG without inspecting their bytes.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// Errors from the EPUB writer.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot create output directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

/// One embedded image: manifest id (also its file name inside the archive) and raw bytes.
#[derive(Debug)]
struct ImageResource {
    id: String,
    data: Vec<u8>,
}

/// Archive file name: `<title>_<chapter slug>.epub`.
pub fn archive_file_name(meta: &MangaMetadata, slug: &str) -> String {
    format!("{}_{}.epub", strip_reserved(&meta.title), slug)
}

/// Build and write the EPUB for one chapter into `output_dir`, replacing any previous file.
///
/// Images are embedded in the given order and referenced by file base name. An image that
/// cannot be read is logged and left out; the archive is still written.
pub fn build_chapter_archive(
    meta: &MangaMetadata,
    chapter_title: &str,
    image_paths: &[PathBuf],
    output_dir: &Path,
) -> Result<PathBuf, EpubError> {
    let slug = chapter_slug(chapter_title);
    write_chapter_archive(meta, chapter_title, &slug, image_paths, output_dir)
}

/// Like [build_chapter_archive], with the file name taken from an already assigned `slug`.
pub fn write_chapter_archive(
    meta: &MangaMetadata,
    chapter_title: &str,
    slug: &str,
    image_paths: &[PathBuf],
    output_dir: &Path,
) -> Result<PathBuf, EpubError> {
    let images = load_images(image_paths);

    std::fs::create_dir_all(output_dir).map_err(|e| EpubError::Io {
        path: output_dir.to_path_buf(),
        source: e,
    })?;
    let path = output_dir.join(archive_file_name(meta, slug));
    let file = std::fs::File::create(&path).map_err(|e| EpubError::CreateFile {
        path: path.clone(),
        source: e,
    })?;
    write_archive(meta, chapter_title, &images, file)?;
    debug!("EPUB saved as {}", path.display());
    Ok(path)
}

fn load_images(image_paths: &[PathBuf]) -> Vec<ImageResource> {
    let mut seen = HashSet::new();
    let mut images = Vec::with_capacity(image_paths.len());
    for path in image_paths {
        let id = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                error!("Image path has no file name: {}. Skipped.", path.display());
                continue;
            }
        };
        if !seen.insert(id.clone()) {
            error!("Duplicate image name {} ({}). Skipped.", id, path.display());
            continue;
        }
        match std::fs::read(path) {
            Ok(data) => images.push(ImageResource { id, data }),
            Err(e) => error!("Cannot load image {}: {}. Skipped.", path.display(), e),
        }
    }
    images
}

fn write_archive<W: Write + Seek>(
    meta: &MangaMetadata,
    chapter_title: &str,
    images: &[ImageResource],
    writer: W,
) -> Result<(), EpubError> {
    let mut zip = ZipWriter::new(writer);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Mimetype first, uncompressed
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    write_opf(meta, chapter_title, images, &mut zip, options_deflate)?;
    write_nav_xhtml(chapter_title, &mut zip, options_deflate)?;
    write_ncx(meta, chapter_title, &mut zip, options_deflate)?;
    write_content_xhtml(chapter_title, images, &mut zip, options_deflate)?;

    // Already-compressed image data is stored as-is.
    for image in images {
        zip.start_file(format!("{}{}", OEBPS_PREFIX, image.id), options_stored)?;
        zip.write_all(&image.data)?;
    }

    zip.finish()?;
    Ok(())
}

fn identifier(meta: &MangaMetadata, chapter_title: &str) -> String {
    format!("{}-{}", meta.title, chapter_title)
}

fn write_opf(
    meta: &MangaMetadata,
    chapter_title: &str,
    images: &[ImageResource],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut manifest = format!(
        r#"    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="chapter" href="{}" media-type="application/xhtml+xml"/>
"#,
        CONTENT_DOC
    );
    for image in images {
        let id = xml_escape(&image.id);
        manifest.push_str(&format!(
            r#"    <item id="{}" href="{}" media-type="{}"/>
"#,
            id, id, IMAGE_MEDIA_TYPE
        ));
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{creator}</dc:creator>
    <dc:language>{language}</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
    <itemref idref="chapter"/>
  </spine>
</package>
"#,
        id = xml_escape(&identifier(meta, chapter_title)),
        title = xml_escape(&format!("{} {}", meta.title, chapter_title)),
        creator = xml_escape(&meta.author),
        language = LANGUAGE,
        manifest = manifest,
    );

    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), options)?;
    zip.write_all(opf.as_bytes())?;
    Ok(())
}

/// EPUB 3 navigation document with the single content document as its only entry.
fn write_nav_xhtml(
    chapter_title: &str,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
      <li><a href="{doc}">{title}</a></li>
    </ol>
  </nav>
</body>
</html>
"#,
        lang = LANGUAGE,
        title = xml_escape(chapter_title),
        doc = CONTENT_DOC
    );
    zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(nav.as_bytes())?;
    Ok(())
}

fn write_ncx(
    meta: &MangaMetadata,
    chapter_title: &str,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
  </head>
  <docTitle>
    <text>{doc_title}</text>
  </docTitle>
  <navMap>
    <navPoint id="navpoint-1" playOrder="1">
      <navLabel><text>{label}</text></navLabel>
      <content src="{doc}"/>
    </navPoint>
  </navMap>
</ncx>
"#,
        uid = xml_escape(&identifier(meta, chapter_title)),
        doc_title = xml_escape(&format!("{} {}", meta.title, chapter_title)),
        label = xml_escape(chapter_title),
        doc = CONTENT_DOC
    );
    zip.start_file(format!("{}toc.ncx", OEBPS_PREFIX), options)?;
    zip.write_all(ncx.as_bytes())?;
    Ok(())
}

/// The image flow: one `<img>` followed by a line break per image, in order.
fn write_content_xhtml(
    chapter_title: &str,
    images: &[ImageResource],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let title = xml_escape(chapter_title);
    let mut body = String::new();
    for image in images {
        body.push_str(&format!(
            "  <img src=\"{}\" alt=\"{}\" style=\"max-width:100%;\"/><br/>\n",
            xml_escape(&image.id),
            title
        ));
    }
    let html = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="{lang}" xml:lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
</head>
<body>
{body}</body>
</html>
"#,
        lang = LANGUAGE,
        title = title,
        body = body
    );
    zip.start_file(format!("{}{}", OEBPS_PREFIX, CONTENT_DOC), options)?;
    zip.write_all(html.as_bytes())?;
    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::read::ZipArchive;

    fn meta() -> MangaMetadata {
        MangaMetadata {
            title: "Test Comic".to_string(),
            author: "Test Author".to_string(),
        }
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "comic2epub_epub_{}_{}",
            name,
            std::process::id()
        ));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_images(dir: &Path, count: usize) -> Vec<PathBuf> {
        (1..=count)
            .map(|i| {
                let p = dir.join(format!("{:03}.jpg", i));
                std::fs::write(&p, format!("jpeg-{}", i)).unwrap();
                p
            })
            .collect()
    }

    fn read_entry(zip: &mut ZipArchive<std::fs::File>, name: &str) -> String {
        let mut entry = zip.by_name(name).unwrap();
        let mut s = String::new();
        entry.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn archive_file_name_uses_slugified_chapter() {
        let dir = test_dir("name");
        let path = build_chapter_archive(&meta(), "Ch 1: The/Beginning?", &[], &dir).unwrap();
        assert_eq!(path, dir.join("Test Comic_Ch_1_TheBeginning.epub"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn parent_directory_title_stays_inside_output_dir() {
        let dir = test_dir("dotdot");
        let path = build_chapter_archive(&meta(), "..", &[], &dir).unwrap();
        assert_eq!(path, dir.join("Test Comic_unknown_chapter.epub"));
        assert!(path.is_file());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn assigned_slug_names_the_archive() {
        let dir = test_dir("slug");
        let path = write_chapter_archive(&meta(), "Extra", "Extra_2", &[], &dir).unwrap();
        assert_eq!(path, dir.join("Test Comic_Extra_2.epub"));
        let file = std::fs::File::open(&path).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let nav = read_entry(&mut zip, "OEBPS/nav.xhtml");
        assert!(nav.contains(">Extra</a>"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn writes_images_in_order_with_single_toc_entry() {
        let dir = test_dir("order");
        let images = write_images(&dir, 3);
        let path = build_chapter_archive(&meta(), "Chapter 1", &images, &dir).unwrap();
        assert_eq!(path, dir.join("Test Comic_Chapter_1.epub"));

        let file = std::fs::File::open(&path).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        assert_eq!(zip.by_index(0).unwrap().name(), "mimetype");
        assert!(names.contains(&"META-INF/container.xml".to_string()));
        for n in ["001.jpg", "002.jpg", "003.jpg"] {
            assert!(names.contains(&format!("OEBPS/{}", n)), "missing {}", n);
        }

        let content = read_entry(&mut zip, "OEBPS/chapter.xhtml");
        let first = content.find("src=\"001.jpg\"").unwrap();
        let second = content.find("src=\"002.jpg\"").unwrap();
        let third = content.find("src=\"003.jpg\"").unwrap();
        assert!(first < second && second < third);
        assert_eq!(content.matches("<br/>").count(), 3);

        let opf = read_entry(&mut zip, "OEBPS/content.opf");
        assert_eq!(opf.matches("media-type=\"image/jpeg\"").count(), 3);
        assert!(opf.contains(r#"<item id="002.jpg" href="002.jpg""#));
        assert!(opf.contains("<dc:language>zh</dc:language>"));
        assert!(opf.contains("<dc:title>Test Comic Chapter 1</dc:title>"));

        let nav = read_entry(&mut zip, "OEBPS/nav.xhtml");
        assert_eq!(nav.matches("<li>").count(), 1);
        let ncx = read_entry(&mut zip, "OEBPS/toc.ncx");
        assert_eq!(ncx.matches("<navPoint").count(), 1);

        let mut img = zip.by_name("OEBPS/002.jpg").unwrap();
        let mut data = Vec::new();
        img.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"jpeg-2");
        drop(img);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unreadable_image_is_skipped() {
        let dir = test_dir("missing");
        let mut images = write_images(&dir, 2);
        images.insert(1, dir.join("gone.jpg"));
        let path = build_chapter_archive(&meta(), "Ch", &images, &dir).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        assert!(zip.by_name("OEBPS/gone.jpg").is_err());
        let opf = read_entry(&mut zip, "OEBPS/content.opf");
        assert_eq!(opf.matches("media-type=\"image/jpeg\"").count(), 2);
        let content = read_entry(&mut zip, "OEBPS/chapter.xhtml");
        assert!(!content.contains("gone.jpg"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn existing_archive_is_overwritten() {
        let dir = test_dir("overwrite");
        let images = write_images(&dir, 1);
        let target = dir.join(archive_file_name(&meta(), "Ch"));
        assert_eq!(target, dir.join("Test Comic_Ch.epub"));
        std::fs::write(&target, b"stale").unwrap();
        build_chapter_archive(&meta(), "Ch", &images, &dir).unwrap();
        let file = std::fs::File::open(&target).unwrap();
        assert!(ZipArchive::new(file).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn titles_are_escaped() {
        let dir = test_dir("escape");
        let m = MangaMetadata {
            title: "Tom & Jerry".to_string(),
            author: "<Anon>".to_string(),
        };
        let path = build_chapter_archive(&m, "A \"quoted\" chapter", &[], &dir).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let opf = read_entry(&mut zip, "OEBPS/content.opf");
        assert!(opf.contains("Tom &amp; Jerry"));
        assert!(opf.contains("<dc:creator>&lt;Anon&gt;</dc:creator>"));
        let nav = read_entry(&mut zip, "OEBPS/nav.xhtml");
        assert!(nav.contains("A &quot;quoted&quot; chapter"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn output_dir_that_is_a_file_is_error() {
        let dir = test_dir("blocked");
        let blocker = dir.join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let result = build_chapter_archive(&meta(), "Ch", &[], &blocker.join("out"));
        assert!(matches!(result, Err(EpubError::Io { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }
}
