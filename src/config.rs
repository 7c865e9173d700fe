use crate::error::{RepoDigestError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable that switches on development mode when set to "development"
pub const APP_ENV: &str = "APP_ENV";

/// How the Gemini backend is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// streamGenerateContent over server-sent events
    Stream,
    /// Single-shot generateContent in JSON mode
    Json,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key (GEMINI_API_KEY or --api-key take precedence)
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Transport protocol used for summarization
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,

    /// Upper bound on a whole summarization call, in seconds
    #[serde(default = "default_summary_timeout")]
    pub summary_timeout_secs: u64,

    /// GitHub REST API base URL
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Gemini API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Include error details in 500 responses
    #[serde(default)]
    pub development: bool,
}

impl Config {
    /// Load configuration from the default location (~/.config/repo-digest/config.toml)
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RepoDigestError::config(format!(
                "Config file not found at: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RepoDigestError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("repo-digest").join("config.toml"))
    }

    /// Write a default configuration file at `path`
    pub fn create_default_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(path, toml_string)?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(RepoDigestError::config("model must not be empty"));
        }

        if self.summary_timeout_secs == 0 {
            return Err(RepoDigestError::config("summary_timeout_secs must be > 0"));
        }

        for (name, value) in [
            ("github_api_url", &self.github_api_url),
            ("gemini_api_url", &self.gemini_api_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                RepoDigestError::config(format!("{} is not a valid URL: {}", name, e))
            })?;
        }

        self.bind_addr.parse::<SocketAddr>().map_err(|e| {
            RepoDigestError::config(format!("bind_addr is not a socket address: {}", e))
        })?;

        Ok(())
    }

    /// Load config from `path` (or the default location), falling back to
    /// defaults when no file exists
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let result = match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        };

        match result {
            Ok(config) => Ok(config),
            Err(RepoDigestError::Config(msg)) if msg.starts_with("Config file not found") => {
                debug!(reason = %msg, "using default configuration");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment overrides. Called once at startup; request handling
    /// never reads the environment.
    pub fn apply_env(mut self) -> Self {
        if std::env::var(APP_ENV).map(|v| v == "development").unwrap_or(false) {
            self.development = true;
        }
        self
    }

    /// The configured API key, if any non-blank one is set
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn summary_timeout(&self) -> Duration {
        Duration::from_secs(self.summary_timeout_secs)
    }

    /// Copy of this config with the API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.gemini_api_key = copy.gemini_api_key.map(|key| {
            let visible: String = key.chars().take(4).collect();
            format!("{}…", visible)
        });
        copy
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: default_model(),
            protocol: default_protocol(),
            summary_timeout_secs: default_summary_timeout(),
            github_api_url: default_github_api_url(),
            gemini_api_url: default_gemini_api_url(),
            bind_addr: default_bind_addr(),
            development: false,
        }
    }
}

// Serde default functions
fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_protocol() -> Protocol {
    Protocol::Stream
}

fn default_summary_timeout() -> u64 {
    120
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}
