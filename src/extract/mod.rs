//! Document → formula records
//!
//! The pipeline is: check the document type, pull its text through a
//! [`TextExtractor`], then hand the text to a [`FormulaSuggester`]. Both are
//! traits so PDF/OCR readers and model-backed suggesters can be plugged in
//! from outside the crate.

pub mod suggest;
pub mod text;

pub use suggest::{FallbackSuggester, FormulaSuggester, PatternSuggester, ResponseSuggester};
pub use text::{check_document, PlainTextExtractor, TextExtractor, SUPPORTED_DOCUMENT_EXTENSIONS};

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::core::registry::FormulaRecord;
use crate::error::{CalcError, CalcResult};

/// Result of extracting formulas from one document
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub message: String,
    pub file_type: String,
    pub text_length: usize,
    pub formulas: Vec<FormulaRecord>,
}

/// Run the extraction pipeline on one document
pub fn extract_formulas(
    path: &Path,
    extractor: &dyn TextExtractor,
    suggester: &dyn FormulaSuggester,
    targets: &[String],
) -> CalcResult<ExtractionReport> {
    check_document(path)?;

    let text = extractor.extract(path);
    if text.trim().is_empty() {
        return Err(CalcError::EmptyDocument(format!(
            "Could not extract text from {} or the file was empty",
            path.display()
        )));
    }

    let formulas = suggester.suggest(&text, targets)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let message = if formulas.is_empty() {
        "File processed successfully, but no mathematical formulas were found.".to_string()
    } else {
        format!(
            "Successfully extracted {} formulas from {}.",
            formulas.len(),
            filename
        )
    };
    info!(
        path = %path.display(),
        chars = text.chars().count(),
        formulas = formulas.len(),
        suggester = suggester.name(),
        "Extraction finished"
    );

    Ok(ExtractionReport {
        message,
        file_type: text::document_extension(path)
            .map(|e| format!(".{}", e))
            .unwrap_or_default(),
        text_length: text.chars().count(),
        formulas,
    })
}
