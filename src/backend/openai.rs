//! Backend for OpenAI-compatible chat completion APIs.
//!
//! Endpoint: `{base_url}/v1/chat/completions`, non-streaming.

use super::{Completion, CompletionBackend, CompletionRequest};
use crate::error::{AnalyzerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default base URL of the OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Backend for any OpenAI-compatible API.
///
/// # Example
///
/// ```
/// use tone_analyzer::backend::OpenAiBackend;
///
/// let backend = OpenAiBackend::new("https://api.openai.com").with_api_key("sk-...");
/// assert!(backend.has_api_key());
/// ```
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    /// Sent as `Authorization: Bearer {key}` when set.
    api_key: Option<String>,
    /// Sent as `OpenAI-Organization: {org}` when set.
    organization: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &self.api_key.as_ref().map(|k| redact(k)),
            )
            .field("organization", &self.organization)
            .finish()
    }
}

/// Keep a short prefix of a secret for identification, hide the rest.
pub(crate) fn redact(secret: &str) -> String {
    match secret.char_indices().nth(6) {
        Some((idx, _)) => format!("{}***", &secret[..idx]),
        None => "***".to_string(),
    }
}

impl OpenAiBackend {
    /// Create a backend for the given base URL, without authentication.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            organization: None,
        }
    }

    /// Use a preconfigured HTTP client (cheap to clone, shares its pool).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set the API key for authentication.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the organization ID header.
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Returns `true` if an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Build the request body for `/v1/chat/completions`.
    fn build_body(request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
        });

        if let Some(temperature) = request.config.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if request.config.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        body
    }

    /// Build the reqwest request with appropriate headers.
    fn build_http_request(&self, url: &str, body: &Value) -> reqwest::RequestBuilder {
        let mut req = self.client.post(url).json(body);

        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        if let Some(ref org) = self.organization {
            req = req.header("OpenAI-Organization", org.as_str());
        }

        req
    }

    /// Pull the human-readable message out of an OpenAI error body, if it has one.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string())
    }

    /// Extract metadata from an OpenAI response.
    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for key in ["usage", "model", "id"] {
            if let Some(v) = json_resp.get(key) {
                meta.insert(key.into(), v.clone());
            }
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = self.endpoint();
        let body = Self::build_body(request);

        let resp = self.build_http_request(&url, &body).send().await?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AnalyzerError::HttpError {
                status,
                body: Self::error_message(&text),
            });
        }

        let json_resp: Value = resp.json().await?;

        // A missing or null content is not the same as an empty reply.
        let text = json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .ok_or(AnalyzerError::MissingContent)?
            .to_string();

        Ok(Completion {
            text,
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChatMessage, LlmConfig};
    use crate::error::ErrorKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4.1-mini".into(),
            messages: vec![
                ChatMessage::system("Eres un analizador."),
                ChatMessage::user("Text to analyze:\n\nhola"),
            ],
            config: LlmConfig::default().with_json_mode(true),
        }
    }

    fn chat_reply(content: Value) -> Value {
        json!({
            "id": "chatcmpl-123",
            "model": "gpt-4.1-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        })
    }

    #[test]
    fn test_body_shape() {
        let body = OpenAiBackend::build_body(&test_request());

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Text to analyze:\n\nhola");
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_body_without_json_mode() {
        let mut request = test_request();
        request.config = LlmConfig::default().with_temperature(0.3);
        let body = OpenAiBackend::build_body(&request);
        assert!(body.get("response_format").is_none());
        assert_eq!(body["temperature"], 0.3);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = OpenAiBackend::new(DEFAULT_BASE_URL).with_api_key("sk-1234567890abcdef");
        let debug_output = format!("{:?}", backend);
        assert!(!debug_output.contains("1234567890abcdef"));
        assert!(debug_output.contains("sk-123***"));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let backend = OpenAiBackend::new("http://localhost:8080/");
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
        assert_eq!(OpenAiBackend::error_message(body), "Rate limit reached");
        assert_eq!(OpenAiBackend::error_message("upstream down"), "upstream down");
    }

    #[tokio::test]
    async fn test_complete_returns_content_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(json!("{\"a\": 1}"))))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(server.uri()).with_api_key("sk-test");
        let completion = backend.complete(&test_request()).await.unwrap();

        assert_eq!(completion.text, "{\"a\": 1}");
        assert_eq!(completion.status, 200);
        let meta = completion.metadata.expect("metadata");
        assert_eq!(meta["id"], "chatcmpl-123");
    }

    #[tokio::test]
    async fn test_complete_sends_json_mode_and_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(json!("{}"))))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(server.uri());
        backend.complete(&test_request()).await.unwrap();

        let received = server.received_requests().await.expect("recording enabled");
        assert_eq!(received.len(), 1);
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body, OpenAiBackend::build_body(&test_request()));
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_is_backend_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(
                json!({"error": {"message": "Rate limit reached for gpt-4.1-mini"}}),
            ))
            .mount(&server)
            .await;

        let err = OpenAiBackend::new(server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(matches!(err, AnalyzerError::HttpError { status: 429, .. }));
        assert!(err.to_string().contains("Rate limit reached for gpt-4.1-mini"));
    }

    #[tokio::test]
    async fn test_auth_failure_is_backend_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = OpenAiBackend::new(server.uri())
            .with_api_key("sk-wrong")
            .complete(&test_request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_null_content_is_missing_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(Value::Null)))
            .mount(&server)
            .await;

        let err = OpenAiBackend::new(server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingContent));
    }

    #[tokio::test]
    async fn test_no_choices_is_missing_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = OpenAiBackend::new(server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingContent));
    }

    #[tokio::test]
    async fn test_empty_content_is_returned_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(json!(""))))
            .mount(&server)
            .await;

        let completion = OpenAiBackend::new(server.uri())
            .complete(&test_request())
            .await
            .unwrap();
        assert_eq!(completion.text, "");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is essentially never listening on loopback.
        let err = OpenAiBackend::new("http://127.0.0.1:9")
            .complete(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Transport(_)));
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }
}
