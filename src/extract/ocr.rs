//! OCR through the external `pdftoppm` (Poppler) and `tesseract` binaries

use crate::config::ExtractionConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR is disabled in the server configuration")]
    Disabled,

    #[error(
        "OCR extraction requires Poppler. Install Poppler for your system:\n\
         - macOS: brew install poppler\n\
         - Linux: sudo apt-get install poppler-utils"
    )]
    PopplerMissing,

    #[error("OCR requires Tesseract. Install tesseract-ocr so that '{0}' can be executed")]
    TesseractMissing(String),

    #[error("PDF conversion failed: {0}")]
    Rasterize(String),

    #[error("Tesseract failed: {0}")]
    Recognize(String),

    #[error("OCR I/O error: {0}")]
    Io(#[from] io::Error),
}

fn stderr_text(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}

/// Recognise the text of a single image file
pub fn ocr_image(path: &Path, config: &ExtractionConfig) -> Result<String, OcrError> {
    if !config.ocr_enabled {
        return Err(OcrError::Disabled);
    }

    let output = Command::new(&config.tesseract_command)
        .arg(path)
        .arg("stdout")
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => OcrError::TesseractMissing(config.tesseract_command.clone()),
            _ => OcrError::Io(e),
        })?;

    if !output.status.success() {
        return Err(OcrError::Recognize(stderr_text(&output)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Page number encoded in a `pdftoppm` output name such as `page-07.png`
fn page_number(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .rsplit('-')
        .next()?
        .parse()
        .ok()
}

/// Rasterise every page of `pdf` into `dir`, returning the images in page order
fn rasterize(pdf: &Path, dir: &Path, config: &ExtractionConfig) -> Result<Vec<PathBuf>, OcrError> {
    let output = Command::new(&config.pdftoppm_command)
        .arg("-r")
        .arg(config.ocr_dpi.to_string())
        .arg("-png")
        .arg(pdf)
        .arg(dir.join("page"))
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => OcrError::PopplerMissing,
            _ => OcrError::Io(e),
        })?;

    if !output.status.success() {
        return Err(OcrError::Rasterize(stderr_text(&output)));
    }

    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort_by_key(|(n, _)| *n);

    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// OCR a scanned PDF page by page
///
/// Pages that fail or yield no text are skipped; the remaining pages are
/// joined as `\n--- Page N ---\n<text>\n`.
pub fn ocr_pdf(path: &Path, config: &ExtractionConfig) -> Result<String, OcrError> {
    if !config.ocr_enabled {
        return Err(OcrError::Disabled);
    }

    let scratch = tempfile::tempdir()?;
    let pages = rasterize(path, scratch.path(), config)?;
    tracing::debug!(page_count = pages.len(), file = %path.display(), "Rasterised PDF for OCR");

    let mut text = String::new();
    for (index, page) in pages.iter().enumerate() {
        let page_no = index + 1;
        match ocr_image(page, config) {
            Ok(page_text) if !page_text.trim().is_empty() => {
                text.push_str(&format!("\n--- Page {} ---\n{}\n", page_no, page_text));
            }
            Ok(_) => {
                tracing::debug!(page = page_no, "No text found on page");
            }
            // A missing binary fails every page the same way
            Err(e @ OcrError::TesseractMissing(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(page = page_no, error = %e, "OCR failed for page; skipping");
            }
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(tesseract: &str, pdftoppm: &str) -> ExtractionConfig {
        ExtractionConfig {
            ocr_enabled: true,
            tesseract_command: tesseract.to_string(),
            pdftoppm_command: pdftoppm.to_string(),
            ocr_dpi: 200,
        }
    }

    #[test]
    fn test_page_number_parsing() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/cover.png")), None);
    }

    #[test]
    fn test_disabled_ocr_is_reported() {
        let config = ExtractionConfig {
            ocr_enabled: false,
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            ocr_image(Path::new("scan.png"), &config),
            Err(OcrError::Disabled)
        ));
        assert!(matches!(
            ocr_pdf(Path::new("scan.pdf"), &config),
            Err(OcrError::Disabled)
        ));
    }

    #[test]
    fn test_missing_tesseract_binary() {
        let config = config_with("definitely-not-tesseract-binary", "pdftoppm");
        let err = ocr_image(Path::new("scan.png"), &config).unwrap_err();
        assert!(matches!(err, OcrError::TesseractMissing(_)));
        assert!(err.to_string().contains("definitely-not-tesseract-binary"));
    }

    #[test]
    fn test_missing_poppler_names_install_step() {
        let config = config_with("tesseract", "definitely-not-pdftoppm-binary");
        let err = ocr_pdf(Path::new("scan.pdf"), &config).unwrap_err();
        assert!(matches!(err, OcrError::PopplerMissing));
        assert!(err.to_string().contains("poppler-utils"));
    }
}
