//! Document loading: discovers `.txt` and `.pdf` files in a directory and
//! extracts their text.
//!
//! Extraction failures are never fatal to a load: a document that cannot
//! be read or parsed contributes empty text and is dropped, while the
//! rest of the directory is processed normally.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::Result;

/// A reserved filename that is never indexed.
const RESERVED_README: &str = "README.md";

/// A raw document: its filename and extracted text content.
///
/// Transient; documents are discarded once chunked.
#[derive(Debug, Clone)]
pub struct Document {
    /// Bare filename within the documents directory (no path).
    pub filename: String,
    /// Full extracted text.
    pub content: String,
}

/// Load all supported documents from `dir`.
///
/// If the directory does not exist it is created and an empty list is
/// returned (first-run bootstrap, not an error). Hidden files,
/// `README.md`, non-regular files, and unsupported extensions are
/// skipped. Results are ordered by filename; documents whose extracted
/// text is whitespace-only are dropped.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), "created documents directory; add files to index");
        return Ok(Vec::new());
    }

    let mut paths: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.') || name == RESERVED_README {
            continue;
        }
        if !entry.file_type()?.is_file() {
            continue;
        }

        paths.push((name, entry.path()));
    }
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    // Extraction (PDF parsing in particular) is CPU-bound; run it in
    // parallel. Collecting from a par_iter preserves input order.
    let documents: Vec<Document> = paths
        .par_iter()
        .filter_map(|(name, path)| {
            let content = match path.extension().and_then(|e| e.to_str()) {
                Some("pdf") => load_pdf(path),
                Some("txt") => load_txt(path),
                _ => {
                    warn!("skipping unsupported file: {name}");
                    return None;
                }
            };

            if content.trim().is_empty() {
                return None;
            }

            info!("loaded: {name}");
            Some(Document {
                filename: name.clone(),
                content,
            })
        })
        .collect();

    Ok(documents)
}

/// Extract text from a PDF, page by page, joined with newlines.
///
/// Any failure (unreadable file, malformed page) yields empty text for
/// the affected scope rather than an error.
fn load_pdf(path: &Path) -> String {
    let doc = match lopdf::Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("error loading PDF {}: {e}", path.display());
            return String::new();
        }
    };

    let mut text = String::new();
    for &page_number in doc.get_pages().keys() {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(
                    "error extracting page {page_number} of {}: {e}",
                    path.display()
                );
            }
        }
    }
    text
}

/// Read a text file as UTF-8; failures yield empty text.
fn load_txt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("error loading TXT {}: {e}", path.display());
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_created_and_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("docs");

        let documents = load_documents(&dir).unwrap();
        assert!(documents.is_empty());
        assert!(dir.exists());
    }

    #[test]
    fn loads_txt_files_sorted_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("z.txt"), "zebra").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "apple").unwrap();

        let documents = load_documents(tmp.path()).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].filename, "a.txt");
        assert_eq!(documents[0].content, "apple");
        assert_eq!(documents[1].filename, "z.txt");
    }

    #[test]
    fn skips_unsupported_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("notes.docx"), "binary").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "plain text").unwrap();

        let documents = load_documents(tmp.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].filename, "notes.txt");
    }

    #[test]
    fn skips_hidden_files_and_readme() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".hidden.txt"), "secret").unwrap();
        std::fs::write(tmp.path().join("README.md"), "# docs").unwrap();
        std::fs::write(tmp.path().join("visible.txt"), "hello").unwrap();

        let documents = load_documents(tmp.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].filename, "visible.txt");
    }

    #[test]
    fn skips_directories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("subdir.txt")).unwrap();
        std::fs::write(tmp.path().join("file.txt"), "content").unwrap();

        let documents = load_documents(tmp.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].filename, "file.txt");
    }

    #[test]
    fn drops_whitespace_only_documents() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("blank.txt"), "  \n\t\n").unwrap();
        std::fs::write(tmp.path().join("real.txt"), "words").unwrap();

        let documents = load_documents(tmp.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].filename, "real.txt");
    }

    #[test]
    fn malformed_pdf_is_dropped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.pdf"), "not a pdf").unwrap();
        std::fs::write(tmp.path().join("ok.txt"), "fine").unwrap();

        let documents = load_documents(tmp.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].filename, "ok.txt");
    }
}
