//! Uploaded-document analysis.
//!
//! Uploads are decoded as UTF-8 text (invalid sequences replaced). Binary
//! formats such as PDF are not parsed, so their "content" is whatever bytes
//! happen to decode.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Characters shown in the preview before it is cut off
pub const PREVIEW_CHARS: usize = 500;

/// Result of analyzing one uploaded document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub file_name: String,
    pub size: usize,
    pub content: String,
    pub preview: String,
    pub stats: DocumentStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    /// Size in bytes
    pub size: usize,
    pub lines: usize,
    pub words: usize,
    /// Number of `## ` headings that start a line after the first
    pub sections: usize,
}

fn whitespace_run() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Analyze an uploaded file
pub fn analyze_document(file_name: &str, bytes: &[u8]) -> DocumentAnalysis {
    let content = String::from_utf8_lossy(bytes).into_owned();
    let size = bytes.len();

    let stats = DocumentStats {
        size,
        lines: content.split('\n').count(),
        // Leading or trailing whitespace counts as an empty word, as does empty input
        words: whitespace_run().split(&content).count(),
        sections: content.matches("\n## ").count(),
    };

    DocumentAnalysis {
        success: true,
        kind: "document",
        file_name: file_name.to_string(),
        size,
        preview: preview(&content),
        content,
        stats,
    }
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}
