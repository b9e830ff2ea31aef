//! DALL·E 3 through the OpenAI images endpoint.

use super::{ImageBackend, ImageError};
use crate::backend::anthropic::redact;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Image generation via `/v1/images/generations`.
///
/// Requests one 1024x1024 image at standard quality in the natural style and
/// asks for `b64_json`, returned as a `data:image/png;base64,` URL.
#[derive(Clone)]
pub struct OpenAiImageBackend {
    api_key: Option<String>,
    base_url: String,
    model: String,
    size: String,
}

impl std::fmt::Debug for OpenAiImageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImageBackend")
            .field("api_key", &self.api_key.as_deref().map(redact))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("size", &self.size)
            .finish()
    }
}

impl OpenAiImageBackend {
    /// Create a backend authenticating with `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        let key: String = api_key.into();
        Self {
            api_key: Some(key).filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
        }
    }

    /// Read the key from `OPENAI_API_KEY`. A missing key is not an error
    /// here; every generation then fails with
    /// [`ImageError::MissingCredentials`] without a request.
    pub fn from_env() -> Self {
        Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())
    }

    /// Point the backend at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the model (default `dall-e-3`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": self.size,
            "quality": "standard",
            "style": "natural",
            "response_format": "b64_json",
        })
    }
}

/// Classify a non-2xx images response.
fn classify(status: u16, body: &str) -> ImageError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        400 if message.to_lowercase().contains("safety") => ImageError::ContentPolicy(message),
        401 => ImageError::InvalidCredentials(message),
        429 => ImageError::RateLimited(message),
        _ => ImageError::Transient(format!("HTTP {}: {}", status, message)),
    }
}

/// Pull the image reference out of a successful response.
fn image_reference(json_resp: &Value) -> Result<String, ImageError> {
    let first = json_resp
        .get("data")
        .and_then(|d| d.get(0))
        .ok_or_else(|| ImageError::Transient("response carried no image data".to_string()))?;
    if let Some(b64) = first.get("b64_json").and_then(Value::as_str) {
        return Ok(format!("data:image/png;base64,{}", b64));
    }
    if let Some(url) = first.get("url").and_then(Value::as_str) {
        return Ok(url.to_string());
    }
    Err(ImageError::Transient(
        "response carried no image payload".to_string(),
    ))
}

#[async_trait]
impl ImageBackend for OpenAiImageBackend {
    async fn generate(&self, client: &Client, prompt: &str) -> Result<String, ImageError> {
        let key = self.api_key.as_ref().ok_or(ImageError::MissingCredentials)?;
        let url = format!("{}/v1/images/generations", self.base_url);

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", key))
            .json(&self.build_body(prompt))
            .send()
            .await
            .map_err(|e| ImageError::Transient(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify(status, &text));
        }

        let json_resp: Value = resp
            .json()
            .await
            .map_err(|e| ImageError::Transient(e.to_string()))?;
        image_reference(&json_resp)
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &'static str {
        "openai-images"
    }
}
