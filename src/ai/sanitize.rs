use crate::ai::SummaryResult;
use crate::error::{RepoDigestError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Matches opening and closing code fences, with or without a `json` tag
fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json)?").expect("fence pattern is valid"))
}

/// Remove every code fence marker and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    fence_pattern().replace_all(raw, "").trim().to_string()
}

/// Parse model output into a `SummaryResult`.
///
/// Fails with `RepoDigestError::Parse` on invalid JSON or any deviation from
/// the summary shape. Nothing is recovered from partial output.
pub fn parse_summary(raw: &str) -> Result<SummaryResult> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| RepoDigestError::Parse(e.to_string()))
}
