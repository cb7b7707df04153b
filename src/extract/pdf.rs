//! PDF text layer with an OCR pass for scanned files

use super::ocr::{self, OcrError};
use crate::config::ExtractionConfig;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("{0}")]
    Parse(String),

    #[error("OCR extraction failed: {0}\n\nPlease upload text-based PDFs or install required dependencies.")]
    Ocr(#[source] OcrError),
}

/// Text layer of the PDF
///
/// `pdf-extract` can panic on malformed font encodings, so the call runs
/// under `catch_unwind` and a panic becomes a parse error.
fn text_layer(path: &Path) -> Result<String, PdfError> {
    let path_buf = path.to_path_buf();
    match std::panic::catch_unwind(|| pdf_extract::extract_text(&path_buf)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(PdfError::Parse(e.to_string())),
        Err(_panic) => Err(PdfError::Parse(format!(
            "PDF parsing panicked (likely malformed font encoding): {}",
            path.display()
        ))),
    }
}

pub fn extract(path: &Path, config: &ExtractionConfig) -> Result<String, PdfError> {
    let text = text_layer(path)?;
    if !text.trim().is_empty() || !config.ocr_enabled {
        return Ok(text);
    }

    tracing::info!(file = %path.display(), "PDF has no text layer, attempting OCR");
    let ocr_text = ocr::ocr_pdf(path, config).map_err(PdfError::Ocr)?;
    if ocr_text.trim().is_empty() {
        tracing::info!(file = %path.display(), "OCR found no text in any page");
        return Ok(text);
    }

    tracing::info!(chars = ocr_text.len(), "OCR extraction succeeded");
    Ok(ocr_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_pdf_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = extract(&path, &ExtractionConfig::default()).unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_ocr_error_message_mentions_dependencies() {
        let err = PdfError::Ocr(OcrError::PopplerMissing);
        let message = err.to_string();
        assert!(message.starts_with("OCR extraction failed: OCR extraction requires Poppler"));
        assert!(message.ends_with("install required dependencies."));
    }
}
