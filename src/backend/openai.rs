//! Backend for OpenAI-compatible chat completion APIs.
//!
//! Endpoint: `/v1/chat/completions`. Covers OpenAI and the many servers that
//! mimic it (vLLM, llama.cpp server, LM Studio, Groq, Together, Ollama `/v1/`).

use super::anthropic::redact;
use super::{parse_retry_after, LlmRequest, LlmResponse, ResponseContent, TextBackend};
use crate::error::Result;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Backend for any OpenAI-compatible chat completion API.
///
/// # Example
///
/// ```
/// use article_pipeline::backend::OpenAiBackend;
///
/// let backend = OpenAiBackend::new("http://localhost:11434").with_api_key("sk-...");
/// assert!(backend.has_api_key());
/// ```
#[derive(Clone)]
pub struct OpenAiBackend {
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(redact))
            .finish()
    }
}

impl OpenAiBackend {
    /// Create a backend for the server at `base_url`, without authentication.
    ///
    /// A trailing `/v1` is stripped so both `http://host` and `http://host/v1`
    /// work.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix("/v1").unwrap_or(trimmed);
        Self {
            base_url: trimmed.to_string(),
            api_key: None,
        }
    }

    /// Set the API key, sent as `Authorization: Bearer {key}`.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns `true` if an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the request body for `/v1/chat/completions`.
    fn build_body(request: &LlmRequest) -> Value {
        let mut messages = Vec::new();
        if !request.system_prompt.is_empty() {
            messages.push(json!({"role": "system", "content": request.system_prompt}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.config.temperature,
            "max_tokens": request.config.max_tokens,
            "stream": false,
        })
    }

    /// Map the first choice's message to a [`ResponseContent`].
    fn first_choice(json_resp: &Value) -> ResponseContent {
        let message = json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"));
        match message.and_then(|m| m.get("content")).and_then(Value::as_str) {
            Some(text) => ResponseContent::Text(text.to_string()),
            None if message.and_then(|m| m.get("tool_calls")).is_some() => {
                ResponseContent::Other {
                    kind: "tool_calls".to_string(),
                }
            }
            None => ResponseContent::Other {
                kind: "empty".to_string(),
            },
        }
    }
}

#[async_trait]
impl TextBackend for OpenAiBackend {
    async fn complete(&self, client: &Client, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = Self::build_body(request);

        let mut req = client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await?;
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
        let metadata = json_resp.get("usage").cloned();

        Ok(LlmResponse {
            content: Self::first_choice(&json_resp),
            status,
            metadata,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_payload() {
        let request = LlmRequest::new("gpt-4o", "You are an editor.", "Fix this.");
        let body = OpenAiBackend::build_body(&request);
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "Fix this.");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_first_choice_text() {
        let resp = json!({"choices": [{"message": {"content": "done"}}]});
        assert_eq!(
            OpenAiBackend::first_choice(&resp),
            ResponseContent::Text("done".into())
        );
    }

    #[test]
    fn test_first_choice_tool_calls() {
        let resp = json!({"choices": [{"message": {"content": null, "tool_calls": []}}]});
        assert_eq!(
            OpenAiBackend::first_choice(&resp),
            ResponseContent::Other {
                kind: "tool_calls".into()
            }
        );
    }

    #[test]
    fn test_base_url_strips_v1() {
        let backend = OpenAiBackend::new("https://api.openai.com/v1/");
        assert_eq!(backend.base_url, "https://api.openai.com");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = OpenAiBackend::new("http://x").with_api_key("sk-1234567890abcdef");
        let debug_output = format!("{:?}", backend);
        assert!(!debug_output.contains("1234567890abcdef"));
    }
}
