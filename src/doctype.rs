//! Document type catalogue defaults and extension-based auto-assignment

use crate::store::StoreError;
use crate::store::document_types::{self, DocumentType};
use rusqlite::Connection;

pub const DEFAULT_ICON: &str = "📄";
pub const DEFAULT_COLOR: &str = "#3B82F6";

/// Type assigned to extensions without a dedicated entry
pub const FALLBACK_TYPE_NAME: &str = "Other Document";

/// A built-in catalogue entry
#[derive(Debug, Clone, Copy)]
pub struct DefaultType {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

pub const DEFAULT_TYPES: &[DefaultType] = &[
    DefaultType {
        name: "PDF Document",
        description: "Portable Document Format files",
        icon: "📄",
        color: "#DC2626",
    },
    DefaultType {
        name: "Word Document",
        description: "Microsoft Word documents (.doc, .docx)",
        icon: "📝",
        color: "#2563EB",
    },
    DefaultType {
        name: "Text Document",
        description: "Plain text files (.txt)",
        icon: "📃",
        color: "#059669",
    },
    DefaultType {
        name: "PowerPoint Presentation",
        description: "Microsoft PowerPoint presentations (.ppt, .pptx)",
        icon: "📊",
        color: "#DC2626",
    },
    DefaultType {
        name: "Excel Spreadsheet",
        description: "Microsoft Excel spreadsheets (.xls, .xlsx)",
        icon: "📈",
        color: "#059669",
    },
    DefaultType {
        name: "Research Paper",
        description: "Academic research papers and publications",
        icon: "🔬",
        color: "#7C3AED",
    },
    DefaultType {
        name: "Lecture Notes",
        description: "Class notes and lecture materials",
        icon: "📚",
        color: "#F59E0B",
    },
    DefaultType {
        name: "Study Guide",
        description: "Study guides and exam preparation materials",
        icon: "📖",
        color: "#10B981",
    },
    DefaultType {
        name: "Other Document",
        description: "Other document types",
        icon: "📋",
        color: "#6B7280",
    },
];

/// Catalogue name for a file extension (case-insensitive, without the dot)
pub fn type_name_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "pdf" => "PDF Document",
        "doc" | "docx" => "Word Document",
        "txt" => "Text Document",
        "ppt" | "pptx" => "PowerPoint Presentation",
        "xls" | "xlsx" => "Excel Spreadsheet",
        _ => FALLBACK_TYPE_NAME,
    }
}

/// Whether `color` is a `#RRGGBB` hex code
pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Find or create the catalogue entry matching `extension`
///
/// Missing entries are created with a description naming the extension. An
/// empty extension resolves to the fallback type.
pub fn resolve_for_extension(
    conn: &Connection,
    extension: &str,
) -> Result<DocumentType, StoreError> {
    let name = type_name_for_extension(extension);
    let description = if extension.is_empty() {
        "Auto-generated type for files without an extension".to_string()
    } else {
        format!("Auto-generated type for {} files", extension.to_uppercase())
    };
    document_types::get_or_create_by_name(conn, name, &description)
}
