use crate::ai::{transport, SummaryResult, Summarizer};
use crate::config::Config;
use crate::error::{RepoDigestError, Result};
use crate::github::fetch::GithubClient;
use crate::github::reference::resolve;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Successful repository analysis
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub repo_data: Value,
    pub ai_summary: SummaryResult,
}

/// HTTP-shaped result of one request
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

/// Orchestrator for the repository analysis pipeline
pub struct Orchestrator {
    github: GithubClient,
    summarizer: Summarizer,
    api_key: Option<String>,
    development: bool,
}

impl Orchestrator {
    /// Create a new orchestrator from explicit parts
    pub fn new(
        github: GithubClient,
        summarizer: Summarizer,
        api_key: Option<String>,
        development: bool,
    ) -> Self {
        Self {
            github,
            summarizer,
            api_key,
            development,
        }
    }

    /// Create an orchestrator wired to the real GitHub and Gemini APIs
    pub fn from_config(config: &Config) -> Result<Self> {
        let github = GithubClient::new(&config.github_api_url)?;
        let summarizer = Summarizer::new(transport::from_config(config)?, config.summary_timeout());

        Ok(Self::new(
            github,
            summarizer,
            config.api_key().map(str::to_string),
            config.development,
        ))
    }

    /// Run the full pipeline for one reference
    pub async fn analyze(&self, input: &str) -> Result<AnalysisResponse> {
        let reference = resolve(input).ok_or(RepoDigestError::InvalidReference)?;
        info!(
            owner = reference.owner(),
            repo = reference.repo(),
            "analyzing repository"
        );

        let repo = self.github.fetch(&reference).await?;
        let ai_summary = self
            .summarizer
            .summarize(&repo, self.api_key.as_deref())
            .await?;

        info!(%reference, features = ai_summary.features.len(), "analysis complete");

        Ok(AnalysisResponse {
            kind: "github",
            repo_data: repo.metadata,
            ai_summary,
        })
    }

    /// Run the pipeline and map the outcome to a status and JSON body
    pub async fn respond(&self, input: &str) -> Reply {
        match self.analyze(input).await {
            Ok(response) => match serde_json::to_value(&response) {
                Ok(body) => Reply { status: 200, body },
                Err(e) => self.error_reply(&RepoDigestError::from(e)),
            },
            Err(e) => self.error_reply(&e),
        }
    }

    /// Status and JSON body for a failed request
    pub fn error_reply(&self, err: &RepoDigestError) -> Reply {
        let status = err.status_code();
        match err {
            RepoDigestError::InvalidReference | RepoDigestError::Upstream { .. } => {
                warn!(status, error = %err, "request rejected");
                Reply {
                    status,
                    body: json!({ "error": err.to_string() }),
                }
            }
            _ => {
                error!(status, kind = err.kind().as_str(), error = %err, "request failed");
                let mut body = json!({ "error": err.to_string() });
                if self.development {
                    body["details"] = Value::String(err.chain());
                }
                Reply { status, body }
            }
        }
    }
}
