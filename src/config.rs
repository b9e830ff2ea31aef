//! Model settings and pipeline configuration.

use crate::error::Result;
use crate::stages::prompts;
use crate::PipelineError;
use std::time::Duration;

/// Default text model.
pub const DEFAULT_TEXT_MODEL: &str = "claude-sonnet-4-20250514";

/// Sampling and length settings for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum output tokens.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// Output-token budget for each text-generating stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageBudgets {
    pub strategist: u32,
    pub writer: u32,
    pub illustrator: u32,
    pub editor: u32,
    pub reviewer: u32,
}

impl Default for StageBudgets {
    fn default() -> Self {
        Self {
            strategist: 2000,
            writer: 4000,
            illustrator: 3000,
            editor: 4000,
            reviewer: 5000,
        }
    }
}

/// Role-specific system instructions, one per stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub strategist: String,
    pub writer: String,
    pub illustrator: String,
    pub editor: String,
    pub reviewer: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            strategist: prompts::STRATEGIST_SYSTEM.to_string(),
            writer: prompts::WRITER_SYSTEM.to_string(),
            illustrator: prompts::ILLUSTRATOR_SYSTEM.to_string(),
            editor: prompts::EDITOR_SYSTEM.to_string(),
            reviewer: prompts::REVIEWER_SYSTEM.to_string(),
        }
    }
}

/// Pipeline behavior: length policy, illustration, model, and prompts.
///
/// # Example
///
/// ```
/// use article_pipeline::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig::default()
///     .with_min_content_length(2000)
///     .with_illustrations(true)
///     .with_image_delay(Duration::from_millis(500));
/// assert!(config.illustrate);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Minimum article length in characters.
    pub min_content_length: usize,
    /// Whether the illustrator stage runs.
    pub illustrate: bool,
    /// Pause between consecutive image generations.
    pub image_delay: Duration,
    /// Attempt budget for each image.
    pub image_retries: u32,
    /// Model used by every text stage.
    pub text_model: String,
    /// Sampling temperature for every text stage.
    pub temperature: f64,
    /// Per-stage output-token budgets.
    pub budgets: StageBudgets,
    /// Per-stage system instructions.
    pub prompts: Prompts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_content_length: 1500,
            illustrate: false,
            image_delay: Duration::from_millis(1500),
            image_retries: 3,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            temperature: 0.7,
            budgets: StageBudgets::default(),
            prompts: Prompts::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `ARTICLE_*` environment variables.
    ///
    /// Reads `ARTICLE_MIN_LENGTH`, `ARTICLE_ILLUSTRATE`,
    /// `ARTICLE_IMAGE_DELAY_MS`, `ARTICLE_IMAGE_RETRIES` and
    /// `ARTICLE_TEXT_MODEL`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = lookup("ARTICLE_MIN_LENGTH") {
            config.min_content_length = parse_var("ARTICLE_MIN_LENGTH", &v)?;
        }
        if let Some(v) = lookup("ARTICLE_ILLUSTRATE") {
            config.illustrate = parse_flag("ARTICLE_ILLUSTRATE", &v)?;
        }
        if let Some(v) = lookup("ARTICLE_IMAGE_DELAY_MS") {
            config.image_delay = Duration::from_millis(parse_var("ARTICLE_IMAGE_DELAY_MS", &v)?);
        }
        if let Some(v) = lookup("ARTICLE_IMAGE_RETRIES") {
            config.image_retries = parse_var("ARTICLE_IMAGE_RETRIES", &v)?;
        }
        if let Some(v) = lookup("ARTICLE_TEXT_MODEL") {
            let model = v.trim();
            if model.is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "ARTICLE_TEXT_MODEL is empty".to_string(),
                ));
            }
            config.text_model = model.to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that can never produce a run.
    pub fn validate(&self) -> Result<()> {
        if self.image_retries == 0 {
            return Err(PipelineError::InvalidConfig(
                "image_retries must be at least 1".to_string(),
            ));
        }
        if self.text_model.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "text_model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_min_content_length(mut self, chars: usize) -> Self {
        self.min_content_length = chars;
        self
    }

    pub fn with_illustrations(mut self, enabled: bool) -> Self {
        self.illustrate = enabled;
        self
    }

    pub fn with_image_delay(mut self, delay: Duration) -> Self {
        self.image_delay = delay;
        self
    }

    pub fn with_image_retries(mut self, retries: u32) -> Self {
        self.image_retries = retries;
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_budgets(mut self, budgets: StageBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Model settings for a call with the given output budget.
    pub(crate) fn llm_config(&self, max_tokens: u32) -> LlmConfig {
        LlmConfig::default()
            .with_temperature(self.temperature)
            .with_max_tokens(max_tokens)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        PipelineError::InvalidConfig(format!("{} has an invalid value: {:?}", key, value))
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(PipelineError::InvalidConfig(format!(
            "{} has an invalid value: {:?}",
            key, value
        ))),
    }
}
