use crate::ai::transport::SummarizationTransport;
use crate::error::{RepoDigestError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, trace};

const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Let the model decide how much to think
const DYNAMIC_THINKING_BUDGET: i32 = -1;

/// Shared HTTP plumbing for both Gemini protocols
#[derive(Debug, Clone)]
pub struct GeminiEndpoint {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiEndpoint {
    /// Create an endpoint for `model` under `base_url`
    /// (e.g. https://generativelanguage.googleapis.com)
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        // No overall request timeout here; the summarizer bounds the whole call.
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    /// POST `request` to `method`, turning non-success statuses into
    /// transport errors that carry Gemini's own message
    async fn post(
        &self,
        method: &str,
        query: &[(&str, &str)],
        request: &GeminiRequest,
        api_key: &str,
    ) -> Result<Response> {
        let response = self
            .client
            .post(self.method_url(method))
            .query(query)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, method, error = %e, "Gemini request could not be sent");
                RepoDigestError::transport(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let payload = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        let message = serde_json::from_str::<GeminiErrorBody>(&payload)
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| payload.clone());

        error!(
            model = %self.model,
            method,
            status = status.as_u16(),
            %payload,
            "Gemini API returned an error"
        );
        Err(RepoDigestError::transport(format!(
            "Gemini API error {}: {}",
            status.as_u16(),
            message
        )))
    }
}

/// Streaming protocol: `streamGenerateContent` read as server-sent events.
///
/// The whole stream is consumed before the text is returned.
#[derive(Debug, Clone)]
pub struct GeminiStreamTransport {
    endpoint: GeminiEndpoint,
}

impl GeminiStreamTransport {
    pub fn new(endpoint: GeminiEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl SummarizationTransport for GeminiStreamTransport {
    fn name(&self) -> &'static str {
        "gemini-stream"
    }

    async fn run(&self, prompt: &str, api_key: &str) -> Result<String> {
        let request = GeminiRequest::new(prompt, None);
        let response = self
            .endpoint
            .post("streamGenerateContent", &[("alt", "sse")], &request, api_key)
            .await?;

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut collected = Collected::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                RepoDigestError::transport(format!("Gemini stream interrupted: {}", e))
            })?;
            for data in decoder.push(&chunk) {
                collected.absorb(&data)?;
            }
        }
        if let Some(data) = decoder.finish() {
            collected.absorb(&data)?;
        }

        debug!(
            model = self.endpoint.model(),
            chunks = collected.chunks,
            chars = collected.text.chars().count(),
            "Gemini stream complete"
        );
        collected.into_text()
    }
}

/// Single-shot protocol: one `generateContent` call in JSON mode
#[derive(Debug, Clone)]
pub struct GeminiJsonTransport {
    endpoint: GeminiEndpoint,
}

impl GeminiJsonTransport {
    pub fn new(endpoint: GeminiEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl SummarizationTransport for GeminiJsonTransport {
    fn name(&self) -> &'static str {
        "gemini-json"
    }

    async fn run(&self, prompt: &str, api_key: &str) -> Result<String> {
        let request = GeminiRequest::new(prompt, Some("application/json"));
        let response = self
            .endpoint
            .post("generateContent", &[], &request, api_key)
            .await?;

        let body = response.text().await.map_err(|e| {
            RepoDigestError::transport(format!("Failed to read Gemini response: {}", e))
        })?;
        let mut collected = Collected::default();
        collected.absorb(&body)?;
        collected.into_text()
    }
}

/// Text accumulated from one or more response chunks
#[derive(Debug, Default)]
struct Collected {
    text: String,
    chunks: usize,
    block_reason: Option<String>,
}

impl Collected {
    fn absorb(&mut self, data: &str) -> Result<()> {
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(());
        }

        let chunk: GeminiResponse = serde_json::from_str(data).map_err(|e| {
            error!(error = %e, payload = data, "malformed Gemini response chunk");
            RepoDigestError::transport(format!("Malformed Gemini response: {}", e))
        })?;

        self.chunks += 1;
        let text = chunk.text();
        trace!(chunk = self.chunks, chars = text.len(), "Gemini chunk");
        self.text.push_str(&text);

        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            self.block_reason = Some(reason);
        }
        Ok(())
    }

    fn into_text(self) -> Result<String> {
        match self.block_reason {
            Some(reason) if self.text.is_empty() => Err(RepoDigestError::transport(format!(
                "Gemini blocked the prompt: {}",
                reason
            ))),
            _ => Ok(self.text),
        }
    }
}

/// Incremental server-sent-events decoder yielding `data` payloads.
///
/// Works on bytes so multi-byte characters split across network chunks
/// survive intact.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed bytes, returning the data of every event completed so far
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        // The buffer holds no terminator yet; a new one may start in its last 3 bytes
        let mut from = self.buffer.len().saturating_sub(3);
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some((end, terminator)) = find_event_end(&self.buffer, from) {
            let event: Vec<u8> = self.buffer.drain(..end + terminator).collect();
            if let Some(data) = event_data(&event[..end]) {
                events.push(data);
            }
            from = 0;
        }
        events
    }

    /// Data of a trailing event the server did not terminate
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        event_data(&rest)
    }
}

/// Position and length of the first blank-line event terminator at or after `from`
fn find_event_end(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buffer.len()).find_map(|i| {
        let tail = &buffer[i..];
        if tail.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if tail.starts_with(b"\n\n") {
            Some((i, 2))
        } else {
            None
        }
    })
}

/// Joined `data:` lines of one event, if it has any
fn event_data(event: &[u8]) -> Option<String> {
    let event = String::from_utf8_lossy(event);
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

// Gemini API request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

impl GeminiRequest {
    fn new(prompt: &str, response_mime_type: Option<&str>) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: DYNAMIC_THINKING_BUDGET,
                },
                response_mime_type: response_mime_type.map(str::to_string),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GeminiResponse {
    /// Text of the first candidate, thought parts excluded
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "gemini-2.5-pro";

    fn chunk(text: &str) -> String {
        json!({"candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]})
            .to_string()
    }

    fn sse_body(texts: &[&str]) -> String {
        texts
            .iter()
            .map(|t| format!("data: {}\r\n\r\n", chunk(t)))
            .collect()
    }

    #[test]
    fn test_sse_decoder_handles_split_bytes() {
        let body = format!("data: {}\n\ndata: {}\n\n", chunk("héllo "), chunk("wörld"));
        let mut decoder = SseDecoder::default();
        let mut collected = Collected::default();

        // One byte at a time splits every multi-byte character
        for byte in body.as_bytes() {
            for data in decoder.push(std::slice::from_ref(byte)) {
                collected.absorb(&data).unwrap();
            }
        }
        assert!(decoder.finish().is_none());
        assert_eq!(collected.chunks, 2);
        assert_eq!(collected.into_text().unwrap(), "héllo wörld");
    }

    #[test]
    fn test_sse_decoder_large_event_in_small_chunks() {
        let text = "x".repeat(64 * 1024);
        let frame = format!("data: {}\r\n\r\ndata: tail\n\n", text);
        let mut decoder = SseDecoder::default();

        let mut events = Vec::new();
        for chunk in frame.as_bytes().chunks(7) {
            events.extend(decoder.push(chunk));
        }
        assert_eq!(events, vec![text, "tail".to_string()]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_find_event_end_resumes_before_split_terminator() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: a\r\n\r").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["a".to_string()]);
        assert_eq!(find_event_end(b"ab\n\ncd\n\n", 3), Some((6, 2)));
    }

    #[test]
    fn test_sse_decoder_unterminated_tail() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":1}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_sse_decoder_ignores_comments_and_joins_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\n\ndata: one\ndata: two\n\n");
        assert_eq!(events, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn test_thought_parts_are_skipped() {
        let mut collected = Collected::default();
        let data = json!({"candidates": [{"content": {"parts": [
            {"text": "thinking...", "thought": true},
            {"text": "answer"}
        ]}}]})
        .to_string();
        collected.absorb(&data).unwrap();
        assert_eq!(collected.into_text().unwrap(), "answer");
    }

    #[test]
    fn test_blocked_prompt_is_transport_error() {
        let mut collected = Collected::default();
        collected
            .absorb(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .unwrap();
        let err = collected.into_text().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest::new("hi", Some("application/json"));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["thinkingConfig"]["thinkingBudget"], -1);
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");

        let streaming = serde_json::to_value(GeminiRequest::new("hi", None)).unwrap();
        assert!(streaming["generationConfig"].get("responseMimeType").is_none());
    }

    #[tokio::test]
    async fn test_stream_transport_concatenates_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:streamGenerateContent", MODEL)))
            .and(query_param("alt", "sse"))
            .and(header(API_KEY_HEADER, "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&["```json\n{\"summary\":", "\"x\"}", "\n```"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = GeminiStreamTransport::new(GeminiEndpoint::new(&server.uri(), MODEL).unwrap());
        let text = transport.run("prompt", "test-key").await.unwrap();

        assert_eq!(text, "```json\n{\"summary\":\"x\"}\n```");
    }

    #[tokio::test]
    async fn test_stream_transport_malformed_chunk() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:streamGenerateContent", MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_string("data: {not json\n\n"))
            .mount(&server)
            .await;

        let transport = GeminiStreamTransport::new(GeminiEndpoint::new(&server.uri(), MODEL).unwrap());
        let err = transport.run("prompt", "test-key").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_json_transport_single_shot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", MODEL)))
            .and(header(API_KEY_HEADER, "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(chunk("{\"summary\":\"x\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let transport = GeminiJsonTransport::new(GeminiEndpoint::new(&server.uri(), MODEL).unwrap());
        let text = transport.run("prompt", "test-key").await.unwrap();
        assert_eq!(text, "{\"summary\":\"x\"}");
    }

    #[tokio::test]
    async fn test_error_status_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": 429,
                    "message": "Resource has been exhausted",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })))
            .mount(&server)
            .await;

        let endpoint = GeminiEndpoint::new(&server.uri(), MODEL).unwrap();
        for transport in [
            Box::new(GeminiStreamTransport::new(endpoint.clone())) as Box<dyn SummarizationTransport>,
            Box::new(GeminiJsonTransport::new(endpoint)),
        ] {
            let err = transport.run("prompt", "test-key").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Transport);
            assert_eq!(
                err.to_string(),
                "Gemini API error 429: Resource has been exhausted"
            );
        }
    }
}
