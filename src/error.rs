use std::time::Duration;
use thiserror::Error;

/// Main error type for repo-digest
#[derive(Error, Debug)]
pub enum RepoDigestError {
    /// The user-supplied reference does not name a GitHub repository
    #[error("Invalid GitHub URL")]
    InvalidReference,

    /// GitHub answered with a non-success status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// No AI API key was supplied
    #[error("API key is required")]
    MissingCredential,

    /// Network or protocol failure while talking to the AI backend
    #[error("{0}")]
    Transport(String),

    /// The summarization call did not finish in time
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Model output was not valid summary JSON
    #[error("Invalid summary JSON: {0}")]
    Parse(String),

    /// Any failure inside the AI client, wrapped once at its boundary
    #[error("Failed to generate AI summary: {0}")]
    Summarization(Box<RepoDigestError>),

    /// Request body could not be read as JSON
    #[error("{0}")]
    InvalidBody(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used for status mapping and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidReference,
    Upstream,
    MissingCredential,
    Transport,
    Timeout,
    Parse,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::InvalidReference => "invalid_reference",
            ErrorKind::Upstream => "upstream",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Parse => "parse",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Result type alias for repo-digest operations
pub type Result<T> = std::result::Result<T, RepoDigestError>;

impl RepoDigestError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new AI transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Wrap an AI-client failure. Already-wrapped errors are left alone.
    pub fn summarization(inner: RepoDigestError) -> Self {
        match inner {
            wrapped @ Self::Summarization(_) => wrapped,
            other => Self::Summarization(Box::new(other)),
        }
    }

    /// Classify this error. Wrapped summarization errors report the inner kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidReference => ErrorKind::InvalidReference,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::MissingCredential => ErrorKind::MissingCredential,
            Self::Transport(_) | Self::Http(_) => ErrorKind::Transport,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Summarization(inner) => inner.kind(),
            Self::Config(_) | Self::TomlParse(_) => ErrorKind::Validation,
            Self::InvalidBody(_) | Self::Io(_) | Self::TomlSerialize(_) | Self::Json(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP status this error maps to when returned to a client.
    ///
    /// Only bad references and GitHub upstream failures keep their natural
    /// status; everything else is a 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidReference => 400,
            Self::Upstream { status, .. } if (400..=599).contains(status) => *status,
            Self::Upstream { .. } => 502,
            _ => 500,
        }
    }

    /// Full source chain, used for development-mode error details
    pub fn chain(&self) -> String {
        let mut out = format!("{:?}", self);
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(&format!("\ncaused by: {}", err));
            source = std::error::Error::source(err);
        }
        out
    }
}
