//! Backend for the Anthropic Messages API.
//!
//! Endpoint: `/v1/messages`. The system instruction travels in the top-level
//! `system` field; the user message is the single entry in `messages`. Only
//! the first content block of the response is inspected.

use super::{parse_retry_after, LlmRequest, LlmResponse, ResponseContent, TextBackend};
use crate::error::Result;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Backend for the Anthropic Messages API.
///
/// # Example
///
/// ```
/// use article_pipeline::backend::AnthropicBackend;
///
/// let backend = AnthropicBackend::new("sk-ant-...");
/// assert!(backend.has_api_key());
/// ```
#[derive(Clone)]
pub struct AnthropicBackend {
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Show a short prefix of a secret and mask the rest.
pub(crate) fn redact(key: &str) -> String {
    match key.char_indices().nth(6) {
        Some((idx, _)) => format!("{}***", &key[..idx]),
        None => "***".to_string(),
    }
}

impl AnthropicBackend {
    /// Create a backend authenticating with `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Read the key from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            PipelineError::InvalidConfig("ANTHROPIC_API_KEY is not set".to_string())
        })?;
        Ok(Self::new(key))
    }

    /// Point the backend at a different API root (proxy, gateway, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns `true` if a non-empty API key has been configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Build the request body for `/v1/messages`.
    fn build_body(request: &LlmRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.config.max_tokens,
            "temperature": request.config.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if !request.system_prompt.is_empty() {
            body["system"] = json!(request.system_prompt);
        }
        body
    }

    /// Build the reqwest request with authentication and version headers.
    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
    }

    /// Map the first content block to a [`ResponseContent`].
    fn first_block(json_resp: &Value) -> ResponseContent {
        let Some(block) = json_resp.get("content").and_then(|c| c.get(0)) else {
            return ResponseContent::Other {
                kind: "empty".to_string(),
            };
        };
        let kind = block.get("type").and_then(Value::as_str).unwrap_or("unknown");
        match (kind, block.get("text").and_then(Value::as_str)) {
            ("text", Some(text)) => ResponseContent::Text(text.to_string()),
            _ => ResponseContent::Other {
                kind: kind.to_string(),
            },
        }
    }

    /// Extract usage metadata from a Messages API response.
    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for key in ["usage", "model", "id", "stop_reason"] {
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
impl TextBackend for AnthropicBackend {
    async fn complete(&self, client: &Client, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(request);

        let resp = self.build_http_request(client, &url, &body).send().await?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::HttpError {
                status,
                body: text,
                retry_after,
            });
        }

        let json_resp: Value = resp.json().await?;

        Ok(LlmResponse {
            content: Self::first_block(&json_resp),
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    fn test_request() -> LlmRequest {
        LlmRequest::new("claude-sonnet-4-20250514", "You are a strategist.", "Plan a post.")
            .with_config(LlmConfig::default().with_max_tokens(2000))
    }

    #[test]
    fn test_body_shape() {
        let body = AnthropicBackend::build_body(&test_request());
        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["system"], "You are a strategist.");
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Plan a post.");
    }

    #[test]
    fn test_body_omits_empty_system() {
        let mut request = test_request();
        request.system_prompt.clear();
        let body = AnthropicBackend::build_body(&request);
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_first_block_text() {
        let resp = json!({"content": [{"type": "text", "text": "hello"}]});
        assert_eq!(
            AnthropicBackend::first_block(&resp),
            ResponseContent::Text("hello".into())
        );
    }

    #[test]
    fn test_first_block_non_text() {
        let resp = json!({"content": [{"type": "tool_use", "id": "x", "input": {}}]});
        assert_eq!(
            AnthropicBackend::first_block(&resp),
            ResponseContent::Other {
                kind: "tool_use".into()
            }
        );
    }

    #[test]
    fn test_first_block_empty_content() {
        let resp = json!({"content": []});
        assert!(matches!(
            AnthropicBackend::first_block(&resp),
            ResponseContent::Other { .. }
        ));
    }

    #[test]
    fn test_auth_headers() {
        let backend = AnthropicBackend::new("sk-ant-test123");
        let client = Client::new();
        let req = backend
            .build_http_request(&client, "https://api.anthropic.com/v1/messages", &json!({}))
            .build()
            .expect("build request");
        assert_eq!(req.headers().get("x-api-key").expect("key"), "sk-ant-test123");
        assert_eq!(
            req.headers().get("anthropic-version").expect("version"),
            API_VERSION
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = AnthropicBackend::new("sk-ant-1234567890abcdef");
        let debug_output = format!("{:?}", backend);
        assert!(!debug_output.contains("1234567890abcdef"));
        assert!(debug_output.contains("sk-ant***"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = AnthropicBackend::new("k").with_base_url("http://localhost:8080/");
        assert_eq!(backend.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_has_api_key() {
        assert!(!AnthropicBackend::new("  ").has_api_key());
        assert!(AnthropicBackend::new("sk-ant").has_api_key());
    }
}
