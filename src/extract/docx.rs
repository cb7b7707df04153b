//! Word documents: paragraph text from `word/document.xml`

use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("paragraph pattern is valid"));

static TEXT_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").expect("text run pattern is valid")
});

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("not a valid Word document: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Word document has no word/document.xml part")]
    MissingBody,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Paragraph texts of a `document.xml` body, skipping blank paragraphs
pub fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    PARAGRAPH
        .find_iter(xml)
        .map(|paragraph| {
            TEXT_RUN
                .captures_iter(paragraph.as_str())
                .filter_map(|run| run.get(1))
                .map(|text| decode_entities(text.as_str()))
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .collect()
}

/// Non-blank paragraphs, one per line
pub fn extract(path: &Path) -> Result<String, DocxError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut body) => {
            body.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Err(DocxError::MissingBody),
        Err(e) => return Err(e.into()),
    }

    let mut text = String::new();
    for paragraph in paragraphs_from_xml(&xml) {
        text.push_str(&paragraph);
        text.push('\n');
    }
    Ok(text)
}
