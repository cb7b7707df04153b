//! Text extraction from uploaded study documents
//!
//! Dispatches on the lowercase file extension:
//!
//! - `.pdf`: text layer, then OCR of rasterised pages when the layer is blank
//! - `.docx` / `.doc`: paragraphs of the Word body
//! - `.jpg` / `.jpeg` / `.png`: Tesseract OCR
//! - `.txt`: UTF-8 text
//!
//! Extraction is blocking; async callers go through [`extract_text_async`].

pub mod docx;
pub mod ocr;
pub mod pdf;

use crate::config::ExtractionConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a particular format could not be read
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pdf(#[from] pdf::PdfError),

    #[error(transparent)]
    Docx(#[from] docx::DocxError),

    #[error(transparent)]
    Ocr(#[from] ocr::OcrError),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Error extracting text from {extension} file: {source}")]
    Failed {
        /// Extension with its leading dot, as found on the file
        extension: String,
        #[source]
        source: FormatError,
    },

    #[error(
        "No text could be extracted from the file. The file might be empty, corrupted, \
         or a scanned document without OCR support."
    )]
    Empty,

    #[error("extraction task failed: {0}")]
    Task(String),
}

/// `.ext` of the path as written, or an empty string
fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Coarse format name used as a metrics label
pub fn format_label(path: &Path) -> &'static str {
    match dotted_extension(path).to_lowercase().as_str() {
        ".pdf" => "pdf",
        ".docx" | ".doc" => "docx",
        ".jpg" | ".jpeg" | ".png" => "image",
        ".txt" => "txt",
        _ => "other",
    }
}

fn read_format(path: &Path, extension: &str, config: &ExtractionConfig) -> Result<String, FormatError> {
    match extension.to_lowercase().as_str() {
        ".pdf" => Ok(pdf::extract(path, config)?),
        ".docx" | ".doc" => Ok(docx::extract(path)?),
        ".jpg" | ".jpeg" | ".png" => Ok(ocr::ocr_image(path, config)?),
        ".txt" => Ok(std::fs::read_to_string(path)?),
        _ => Err(FormatError::Unsupported(extension.to_string())),
    }
}

/// Extract and trim the text of a stored file
pub fn extract_text(path: &Path, config: &ExtractionConfig) -> Result<String, ExtractionError> {
    let extension = dotted_extension(path);
    let raw = read_format(path, &extension, config)
        .map_err(|source| ExtractionError::Failed { extension, source })?;

    let text = raw.trim();
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text.to_string())
}

/// [`extract_text`] on the blocking thread pool
pub async fn extract_text_async(
    path: PathBuf,
    config: ExtractionConfig,
) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&path, &config))
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))?
}
