use crate::error::{RepoDigestError, Result};
use crate::github::{RepoReference, RepositoryData};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const RAW_CONTENT: &str = "application/vnd.github.v3.raw";
const USER_AGENT: &str = concat!("repo-digest/", env!("CARGO_PKG_VERSION"));

/// Client for the two GitHub endpoints the pipeline needs
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    base_url: Url,
}

/// Error body GitHub sends with non-success responses
#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: Option<String>,
}

impl GithubClient {
    /// Create a new GitHub client against `base_url` (e.g. https://api.github.com)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            RepoDigestError::config(format!("invalid GitHub API URL {}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RepoDigestError::config(format!(
                "GitHub API URL cannot be a base: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// `{base}/repos/{owner}/{repo}[/{extra}]`, each segment percent-encoded
    fn endpoint(&self, reference: &RepoReference, extra: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", reference.owner(), reference.repo()])
                .extend(extra);
        }
        url
    }

    /// Fetch repository metadata and README for `reference`.
    ///
    /// Both requests run concurrently. A metadata failure is returned as
    /// `Upstream` with GitHub's status and message; README failures only
    /// produce an empty README.
    pub async fn fetch(&self, reference: &RepoReference) -> Result<RepositoryData> {
        let (metadata, readme) =
            tokio::join!(self.fetch_metadata(reference), self.fetch_readme(reference));

        Ok(RepositoryData {
            reference: reference.clone(),
            metadata: metadata?,
            readme,
        })
    }

    async fn fetch_metadata(&self, reference: &RepoReference) -> Result<Value> {
        let url = self.endpoint(reference, None);
        debug!(%reference, %url, "fetching repository metadata");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GithubErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "GitHub API error".to_string());
            warn!(%reference, status, %message, "repository metadata request failed");
            return Err(RepoDigestError::Upstream { status, message });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn fetch_readme(&self, reference: &RepoReference) -> String {
        let url = self.endpoint(reference, Some("readme"));
        debug!(%reference, %url, "fetching README");

        let response = match self.client.get(url).header(ACCEPT, RAW_CONTENT).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%reference, error = %e, "README request failed, continuing without it");
                return String::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                %reference,
                status = response.status().as_u16(),
                "README not available, continuing without it"
            );
            return String::new();
        }

        match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(%reference, error = %e, "could not read README body, continuing without it");
                String::new()
            }
        }
    }
}
