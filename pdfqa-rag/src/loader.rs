//! PDF loading and extracted-text persistence.
//!
//! [`DocumentLoader`] turns a directory of PDF files into [`Document`]s. Text
//! extraction goes through the [`TextExtractor`] seam; [`PdfExtractor`] is the
//! production implementation built on `pdf-extract`.

use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{Document, PageSpan};
use crate::error::{RagError, Result};

/// Extracts the text of each page of a file.
pub trait TextExtractor: Send + Sync {
    /// Return the raw text of every page, in page order.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// [`TextExtractor`] backed by the `pdf-extract` crate.
///
/// `pdf-extract` panics on some malformed files; panics are caught and
/// reported as [`RagError::Extraction`] like any other failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(RagError::extraction(path, e.to_string())),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(RagError::extraction(path, format!("extractor panicked: {message}")))
            }
        }
    }
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a [`Document`] from raw page texts, recording where each page starts.
///
/// Pages that are blank after cleaning are skipped.
pub fn document_from_pages(id: &str, source: &str, pages: &[String]) -> Document {
    let mut text = String::new();
    let mut spans = Vec::new();
    let mut offset = 0;

    for (i, page) in pages.iter().enumerate() {
        let cleaned = clean_text(page);
        if cleaned.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
            offset += 1;
        }
        spans.push(PageSpan { number: i + 1, start: offset });
        offset += cleaned.chars().count();
        text.push_str(&cleaned);
    }

    let mut document = Document::new(id, source, text);
    document.metadata.insert("source".to_string(), source.to_string());
    document.metadata.insert("page_count".to_string(), pages.len().to_string());
    document.pages = spans;
    document
}

/// A file that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: RagError,
}

/// Outcome of loading a directory: the documents that loaded and the files that did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadFailure>,
}

/// Loads every PDF in a directory into [`Document`]s.
///
/// A file that fails to extract is logged and reported in
/// [`LoadReport::failures`]; it never aborts the rest of the batch.
#[derive(Clone)]
pub struct DocumentLoader {
    extractor: Arc<dyn TextExtractor>,
    workers: usize,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(Arc::new(PdfExtractor))
    }
}

impl DocumentLoader {
    /// Create a loader using the given extractor.
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor, workers: 4 }
    }

    /// Set how many files are extracted at once.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// List the PDF files in `dir`, sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the directory cannot be read.
    pub async fn list_pdfs(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        list_with_extension(dir.as_ref(), "pdf").await
    }

    /// Extract a single file.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref().to_path_buf();
        let (id, source) = file_identity(&path)?;

        let extractor = Arc::clone(&self.extractor);
        let task_path = path.clone();
        let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&task_path))
            .await
            .map_err(|e| RagError::extraction(&path, format!("extraction task failed: {e}")))??;

        let document = document_from_pages(&id, &source, &pages);
        if document.text.is_empty() {
            return Err(RagError::extraction(
                &path,
                "no extractable text (the file may be scanned, encrypted or empty)",
            ));
        }

        info!(
            document.id = %document.id,
            pages = pages.len(),
            characters = document.char_len(),
            words = document.word_count(),
            "extracted document"
        );
        Ok(document)
    }

    /// Load every PDF in `dir`.
    ///
    /// Documents are returned in file-name order regardless of which
    /// extraction finishes first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] only if the directory itself cannot be read.
    pub async fn load_directory(&self, dir: impl AsRef<Path>) -> Result<LoadReport> {
        let dir = dir.as_ref();
        let (files, duplicates) = split_duplicate_ids(Self::list_pdfs(dir).await?);
        if files.is_empty() {
            warn!(dir = %dir.display(), "no PDF files found");
        } else {
            info!(dir = %dir.display(), files = files.len(), "loading PDF files");
        }

        let outcomes: Vec<(PathBuf, Result<Document>)> = stream::iter(files)
            .map(|path| async move {
                let outcome = self.load_file(&path).await;
                (path, outcome)
            })
            .buffered(self.workers)
            .collect()
            .await;

        let mut report = LoadReport { failures: duplicates, ..LoadReport::default() };
        for failure in &report.failures {
            warn!(path = %failure.path.display(), error = %failure.error, "skipping document");
        }
        for (path, outcome) in outcomes {
            match outcome {
                Ok(document) => report.documents.push(document),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "skipping document");
                    report.failures.push(LoadFailure { path, error });
                }
            }
        }
        info!(
            loaded = report.documents.len(),
            failed = report.failures.len(),
            "finished loading directory"
        );
        Ok(report)
    }
}

/// Records the source file and page starts of each saved text, keyed by id.
const MANIFEST_FILE: &str = "sources.json";

#[derive(Debug, Serialize, Deserialize)]
struct SavedText {
    source: String,
    #[serde(default)]
    pages: Vec<PageSpan>,
}

/// Write one `<id>.txt` per document into `dir`, creating it if needed,
/// plus a `sources.json` manifest so [`load_extracted`] can restore each
/// document's source file name and page boundaries.
///
/// Returns the written text paths.
pub async fn save_extracted(dir: impl AsRef<Path>, documents: &[Document]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;

    let mut manifest = read_manifest(dir).await?;
    let mut written = Vec::with_capacity(documents.len());
    for document in documents {
        let path = dir.join(format!("{}.txt", document.id));
        tokio::fs::write(&path, document.text.as_bytes()).await?;
        debug!(path = %path.display(), "saved extracted text");
        manifest.insert(
            document.id.clone(),
            SavedText { source: document.source.clone(), pages: document.pages.clone() },
        );
        written.push(path);
    }
    tokio::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?).await?;
    Ok(written)
}

/// Load previously extracted `*.txt` files from `dir` as documents.
///
/// Source names and page boundaries come from the manifest written by
/// [`save_extracted`]. A text file without a manifest entry is attributed to
/// `<stem>.pdf` and has no page information.
pub async fn load_extracted(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let files = list_with_extension(dir, "txt").await?;
    let mut manifest = read_manifest(dir).await?;
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let (id, _) = file_identity(&path)?;
        let raw = tokio::fs::read_to_string(&path).await?;
        let saved = manifest
            .remove(&id)
            .unwrap_or_else(|| SavedText { source: format!("{id}.pdf"), pages: Vec::new() });
        let mut document = Document::new(id, saved.source.clone(), clean_text(&raw));
        document.metadata.insert("source".to_string(), saved.source);
        document.pages = saved.pages;
        documents.push(document);
    }
    info!(documents = documents.len(), "loaded extracted texts");
    Ok(documents)
}

async fn read_manifest(dir: &Path) -> Result<BTreeMap<String, SavedText>> {
    let path = dir.join(MANIFEST_FILE);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(BTreeMap::new());
    }
    let bytes = tokio::fs::read(&path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Keep the first file for each document id; later files with the same stem
/// (`report.pdf` next to `report.PDF`) become failures.
fn split_duplicate_ids(files: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<LoadFailure>) {
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut unique = Vec::with_capacity(files.len());
    let mut duplicates = Vec::new();
    for path in files {
        let Ok((id, _)) = file_identity(&path) else {
            unique.push(path);
            continue;
        };
        match seen.get(&id) {
            Some(first) => {
                let error = RagError::extraction(
                    &path,
                    format!("document id '{id}' is already used by {}", first.display()),
                );
                duplicates.push(LoadFailure { path, error });
            }
            None => {
                seen.insert(id, path.clone());
                unique.push(path);
            }
        }
    }
    (unique, duplicates)
}

async fn list_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_identity(path: &Path) -> Result<(String, String)> {
    let stem = path.file_stem().and_then(|s| s.to_str());
    let name = path.file_name().and_then(|s| s.to_str());
    match (stem, name) {
        (Some(stem), Some(name)) => Ok((stem.to_string(), name.to_string())),
        _ => Err(RagError::extraction(path, "file name is not valid UTF-8")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Treats file contents as pages separated by form feeds; files containing
    /// `CORRUPT` fail.
    struct FormFeedExtractor;

    impl TextExtractor for FormFeedExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
            let raw = std::fs::read_to_string(path)?;
            if raw.contains("CORRUPT") {
                return Err(RagError::extraction(path, "invalid xref table"));
            }
            Ok(raw.split('\u{c}').map(str::to_string).collect())
        }
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\n\n b\t\tc  \n"), "a b c");
        assert_eq!(clean_text(" \n "), "");
    }

    #[test]
    fn pages_are_joined_and_offsets_recorded() {
        let pages = vec!["first  page".to_string(), "   ".to_string(), "third\npage".to_string()];
        let doc = document_from_pages("doc", "doc.pdf", &pages);
        assert_eq!(doc.text, "first page third page");
        assert_eq!(doc.pages, vec![PageSpan { number: 1, start: 0 }, PageSpan { number: 3, start: 11 }]);
        assert_eq!(doc.page_at(12), Some(3));
    }

    #[tokio::test]
    async fn corrupt_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), "page one\u{c}page two").unwrap();
        std::fs::write(dir.path().join("b.PDF"), "CORRUPT").unwrap();
        std::fs::write(dir.path().join("c.pdf"), "   ").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loader = DocumentLoader::new(Arc::new(FormFeedExtractor));
        let report = loader.load_directory(dir.path()).await.unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].id, "a");
        assert_eq!(report.documents[0].text, "page one page two");
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| matches!(f.error, RagError::Extraction { .. })));
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let loader = DocumentLoader::new(Arc::new(FormFeedExtractor));
        let err = loader.load_directory("/definitely/not/here").await.unwrap_err();
        assert!(matches!(err, RagError::Io(_)));
    }

    #[tokio::test]
    async fn extracted_texts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![Document::new("one", "one.pdf", "alpha beta"), Document::new("two", "two.pdf", "gamma")];
        let written = save_extracted(dir.path().join("texts"), &docs).await.unwrap();
        assert_eq!(written.len(), 2);

        let loaded = load_extracted(dir.path().join("texts")).await.unwrap();
        let texts: Vec<(&str, &str)> = loaded.iter().map(|d| (d.id.as_str(), d.text.as_str())).collect();
        assert_eq!(texts, [("one", "alpha beta"), ("two", "gamma")]);
    }

    #[tokio::test]
    async fn reloaded_texts_keep_the_pdf_source_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec!["intro".to_string(), "details here".to_string()];
        let doc = document_from_pages("guide", "Guide.PDF", &pages);
        save_extracted(dir.path(), std::slice::from_ref(&doc)).await.unwrap();
        std::fs::write(dir.path().join("loose.txt"), "hand written notes").unwrap();

        let loaded = load_extracted(dir.path()).await.unwrap();
        assert_eq!(loaded[0].id, "guide");
        assert_eq!(loaded[0].source, "Guide.PDF");
        assert_eq!(loaded[0].metadata["source"], "Guide.PDF");
        assert_eq!(loaded[0].pages, doc.pages);
        assert_eq!(loaded[1].source, "loose.pdf");
        assert!(loaded[1].pages.is_empty());
    }

    #[tokio::test]
    async fn files_sharing_a_stem_are_reported_not_merged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.PDF"), "upper case copy").unwrap();
        std::fs::write(dir.path().join("report.pdf"), "lower case copy").unwrap();

        let loader = DocumentLoader::new(Arc::new(FormFeedExtractor));
        let report = loader.load_directory(dir.path()).await.unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].source, "report.PDF");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, dir.path().join("report.pdf"));
        match &report.failures[0].error {
            RagError::Extraction { message, .. } => assert!(message.contains("already used")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
