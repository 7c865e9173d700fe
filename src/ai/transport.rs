use crate::ai::gemini::{GeminiEndpoint, GeminiJsonTransport, GeminiStreamTransport};
use crate::config::{Config, Protocol};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// How the generative-AI backend is invoked.
///
/// Implementations return the model's raw text; sanitizing and parsing it is
/// the caller's job.
#[async_trait]
pub trait SummarizationTransport: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Send `prompt` and return the complete response text
    async fn run(&self, prompt: &str, api_key: &str) -> Result<String>;
}

/// Build the transport selected by `config`
pub fn from_config(config: &Config) -> Result<Arc<dyn SummarizationTransport>> {
    let endpoint = GeminiEndpoint::new(&config.gemini_api_url, &config.model)?;

    let transport: Arc<dyn SummarizationTransport> = match config.protocol {
        Protocol::Stream => Arc::new(GeminiStreamTransport::new(endpoint)),
        Protocol::Json => Arc::new(GeminiJsonTransport::new(endpoint)),
    };
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_picks_protocol() {
        let mut config = Config::default();
        assert_eq!(from_config(&config).unwrap().name(), "gemini-stream");

        config.protocol = Protocol::Json;
        assert_eq!(from_config(&config).unwrap().name(), "gemini-json");
    }
}
