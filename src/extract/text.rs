//! Document text extraction

use std::path::Path;

use tracing::warn;

use crate::error::{CalcError, CalcResult};

/// Document kinds the extraction pipeline accepts
pub const SUPPORTED_DOCUMENT_EXTENSIONS: [&str; 10] = [
    "pdf", "docx", "doc", "txt", "md", "png", "jpg", "jpeg", "tiff", "bmp",
];

/// Turns a document into raw text.
///
/// Implementations return an empty string when nothing can be read; the
/// pipeline reports that as an empty document.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> String;
}

/// Lower-cased extension of a path
pub fn document_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Reject documents the pipeline does not accept
pub fn check_document(path: &Path) -> CalcResult<()> {
    match document_extension(path) {
        Some(ext) if SUPPORTED_DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(CalcError::UnsupportedFile(format!(
            "{} (supported: {})",
            path.display(),
            SUPPORTED_DOCUMENT_EXTENSIONS.join(", ")
        ))),
    }
}

/// Reads UTF-8 text documents (`.txt`, `.md`, `.text`).
///
/// PDF, Word and image documents need an external extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn handles(path: &Path) -> bool {
        matches!(
            document_extension(path).as_deref(),
            Some("txt") | Some("md") | Some("text")
        )
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> String {
        if !Self::handles(path) {
            warn!(path = %path.display(), "No text extractor for this document type");
            return String::new();
        }
        match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error extracting text from file");
                String::new()
            }
        }
    }
}
