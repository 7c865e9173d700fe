pub mod gemini;
pub mod prompt;
pub mod sanitize;
pub mod transport;

use crate::error::{RepoDigestError, Result};
use crate::github::RepositoryData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use transport::SummarizationTransport;

/// AI-generated analysis of a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SummaryResult {
    /// One or two paragraphs on the project's purpose
    pub summary: String,
    /// Key features
    pub features: Vec<String>,
    /// Use cases
    pub use_cases: Vec<String>,
    /// Notable statistics
    pub stats: SummaryStats,
}

/// Statistics block of a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub notable_statistics: String,
    /// Any further keys the model chose to include
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SummaryResult {
    /// Format summary as markdown
    pub fn to_markdown(&self, title: &str) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", title));
        output.push_str("## Summary\n\n");
        output.push_str(&self.summary);
        output.push_str("\n\n");

        if !self.features.is_empty() {
            output.push_str("## Features\n\n");
            for feature in &self.features {
                output.push_str(&format!("- {}\n", feature));
            }
            output.push('\n');
        }

        if !self.use_cases.is_empty() {
            output.push_str("## Use Cases\n\n");
            for (i, use_case) in self.use_cases.iter().enumerate() {
                output.push_str(&format!("{}. {}\n", i + 1, use_case));
            }
            output.push('\n');
        }

        output.push_str("## Notable Statistics\n\n");
        output.push_str(&self.stats.notable_statistics);
        output.push('\n');

        output
    }
}

/// Turns fetched repository data into a `SummaryResult` through a transport
#[derive(Clone)]
pub struct Summarizer {
    transport: Arc<dyn SummarizationTransport>,
    timeout: Duration,
}

impl Summarizer {
    /// Create a new summarizer bounded by `timeout`
    pub fn new(transport: Arc<dyn SummarizationTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Summarize a repository.
    ///
    /// Every failure is logged and returned as a single
    /// `RepoDigestError::Summarization`.
    pub async fn summarize(
        &self,
        repo: &RepositoryData,
        api_key: Option<&str>,
    ) -> Result<SummaryResult> {
        match self.try_summarize(repo, api_key).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(
                    repository = %repo.reference,
                    transport = self.transport.name(),
                    kind = e.kind().as_str(),
                    error = %e,
                    details = ?e,
                    "AI summarization failed"
                );
                Err(RepoDigestError::summarization(e))
            }
        }
    }

    async fn try_summarize(
        &self,
        repo: &RepositoryData,
        api_key: Option<&str>,
    ) -> Result<SummaryResult> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(RepoDigestError::MissingCredential)?;

        let prompt = prompt::build_prompt(repo);
        debug!(
            repository = %repo.reference,
            prompt_chars = prompt.chars().count(),
            "sending prompt"
        );

        let raw = tokio::time::timeout(self.timeout, self.transport.run(&prompt, api_key))
            .await
            .map_err(|_| RepoDigestError::Timeout(self.timeout))??;

        info!(
            repository = %repo.reference,
            transport = self.transport.name(),
            response_chars = raw.chars().count(),
            "received model output"
        );

        sanitize::parse_summary(&raw)
    }
}
