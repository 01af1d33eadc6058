//! Configuration for the newspaper briefing pipeline.
//!
//! Everything the pipeline needs to know lives in [`PipelineConfig`], built
//! via [`PipelineConfigBuilder`]. The queue clones it once at construction;
//! jobs never see a config change mid-run.

use crate::error::PipelineError;
use crate::pipeline::classify::SummaryModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default provider used when no pre-built model is injected.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default model identifier for [`DEFAULT_PROVIDER`].
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Environment variable holding the API key for a named edgequake-llm
/// provider.
///
/// Returns `None` for providers that run without a key (`ollama`,
/// `lmstudio`, `mock`, `vscode`) and for names edgequake-llm does not know;
/// the latter are rejected when the provider is created.
pub fn provider_credential_env(provider_name: &str) -> Option<&'static str> {
    match provider_name.trim().to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" | "claude" => Some("ANTHROPIC_API_KEY"),
        "openrouter" | "open-router" => Some("OPENROUTER_API_KEY"),
        "xai" | "grok" => Some("XAI_API_KEY"),
        "mistral" | "mistral-ai" | "mistralai" => Some("MISTRAL_API_KEY"),
        "azure" | "azure-openai" | "azure_openai" | "azureopenai" => Some("AZURE_OPENAI_API_KEY"),
        "huggingface" | "hf" | "hugging-face" | "hugging_face" => Some("HF_TOKEN"),
        _ => None,
    }
}

/// Configuration for the pipeline and its queue.
///
/// # Example
/// ```rust
/// use edgequake_newsbrief::{PipelineConfig, UnmatchedSubjectPolicy};
///
/// let config = PipelineConfig::builder()
///     .uploads_dir("/srv/newsbrief/uploads")
///     .model("gemini-1.5-flash")
///     .unmatched_subject(UnmatchedSubjectPolicy::Skip)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-1.5-flash");
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory uploaded source documents are stored in. Default: `uploads`.
    ///
    /// A job's `file_path` is resolved by file name inside this directory, so
    /// a job can never read outside it.
    pub uploads_dir: PathBuf,

    /// Root under which `summaries/<date>/<slug>.pdf` artifacts are written.
    /// If None, uses `uploads_dir`.
    pub output_dir: Option<PathBuf>,

    /// Pre-constructed summarization model. Takes precedence over
    /// `provider_name` and skips the credential check.
    pub provider: Option<Arc<dyn SummaryModel>>,

    /// edgequake-llm provider name. Default: `gemini`.
    pub provider_name: String,

    /// Model identifier passed to the provider. Default: `gemini-1.5-pro`.
    pub model: String,

    /// Environment variable holding the provider credential. If None, it is
    /// derived from `provider_name` (see [`provider_credential_env`]).
    /// Checked before every summarization call so a missing key fails the
    /// job with a clear message instead of an HTTP error.
    pub credential_env: Option<String>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the whole subject map. Default: 4096.
    pub max_tokens: usize,

    /// Custom instruction prompt. If None, uses the built-in briefing prompt.
    pub system_prompt: Option<String>,

    /// Per-call summarization timeout in seconds. Default: None (wait forever).
    ///
    /// Without a timeout a hung provider stalls the whole queue.
    pub summarize_timeout_secs: Option<u64>,

    /// What to do with a brief whose subject is not registered. Default:
    /// [`UnmatchedSubjectPolicy::AssignToFirst`].
    pub unmatched_subject: UnmatchedSubjectPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            output_dir: None,
            provider: None,
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            credential_env: None,
            temperature: 0.2,
            max_tokens: 4096,
            system_prompt: None,
            summarize_timeout_secs: None,
            unmatched_subject: UnmatchedSubjectPolicy::default(),
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("uploads_dir", &self.uploads_dir)
            .field("output_dir", &self.output_dir)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn SummaryModel>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("credential_env", &self.credential_env)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("summarize_timeout_secs", &self.summarize_timeout_secs)
            .field("unmatched_subject", &self.unmatched_subject)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Credential variable to check before summarizing: the explicit
    /// `credential_env` if set, else the provider's conventional one.
    /// `None` means the provider needs no credential.
    pub fn credential_var(&self) -> Option<String> {
        match self.credential_env {
            Some(ref var) => Some(var.clone()),
            None => provider_credential_env(&self.provider_name).map(str::to_string),
        }
    }

    /// Root directory for rendered artifacts.
    pub fn output_root(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.uploads_dir)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.uploads_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn SummaryModel>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn credential_env(mut self, var: impl Into<String>) -> Self {
        self.config.credential_env = Some(var.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn summarize_timeout_secs(mut self, secs: u64) -> Self {
        self.config.summarize_timeout_secs = Some(secs);
        self
    }

    pub fn unmatched_subject(mut self, policy: UnmatchedSubjectPolicy) -> Self {
        self.config.unmatched_subject = policy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.uploads_dir.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "uploads directory must not be empty".into(),
            ));
        }
        if c.provider.is_none() {
            if c.provider_name.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "provider name must not be empty".into(),
                ));
            }
            if c.model.trim().is_empty() {
                return Err(PipelineError::InvalidConfig("model must not be empty".into()));
            }
        }
        if c.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.summarize_timeout_secs == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "summarize timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// What the persister does with a brief whose subject name matches no
/// registered subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedSubjectPolicy {
    /// File the brief under the first registered subject. (default)
    #[default]
    AssignToFirst,
    /// Drop the brief: no artifact, no article.
    Skip,
}
