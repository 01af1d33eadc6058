//! Subject classification: newspaper text → one brief per covered subject.
//!
//! The model is asked for a strict JSON object mapping subject name to a
//! short markdown summary. Models routinely wrap that object in prose or code
//! fences, so the parser takes everything between the first `{` and the last
//! `}`. If that still is not a JSON object the classifier returns **no
//! briefs** instead of failing: the job completes with zero articles.
//! Render and persistence errors, by contrast, fail the job.
//!
//! A missing credential is different from a bad answer. It is detected
//! before any request is sent and fails the job with
//! [`PipelineError::ProviderNotConfigured`].

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::prompts::{briefing_prompt, PromptPart};
use crate::storage::Repository;
use crate::types::SubjectBrief;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Text-in, text-out summarization capability.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Provider/model label used in logs and error messages.
    fn name(&self) -> &str;

    async fn generate(&self, parts: &[PromptPart]) -> Result<String, PipelineError>;
}

/// [`SummaryModel`] backed by an edgequake-llm provider.
pub struct LlmSummaryModel {
    label: String,
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmSummaryModel {
    pub fn new(
        label: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        temperature: f32,
        max_tokens: usize,
    ) -> Self {
        Self {
            label: label.into(),
            provider,
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl SummaryModel for LlmSummaryModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, parts: &[PromptPart]) -> Result<String, PipelineError> {
        // Instructions go out as the system turn; the newspaper text is the
        // user turn the model answers.
        let messages: Vec<ChatMessage> = parts
            .iter()
            .map(|part| match part {
                PromptPart::Instruction(text) => ChatMessage::system(text),
                PromptPart::Document(text) => ChatMessage::user(text),
            })
            .collect();

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| PipelineError::SummarizationFailed {
                message: format!("{}: {}", self.label, e),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Asks the summarization capability for per-subject briefs.
pub struct SubjectClassifier {
    config: PipelineConfig,
}

impl SubjectClassifier {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Resolve the model for this invocation.
    ///
    /// 1. **Injected model** (`config.provider`): used as-is.
    /// 2. **Credential check**: the variable from
    ///    [`PipelineConfig::credential_var`] must be set and non-empty,
    ///    otherwise the job fails before any network call. Providers without
    ///    a credential (`ollama`) skip this step.
    /// 3. **Named provider**: [`ProviderFactory::create_llm_provider`] with
    ///    `config.provider_name` and `config.model`.
    ///
    /// Resolution runs on every call, so a key exported after start-up is
    /// picked up by the next job.
    pub fn resolve_model(&self) -> Result<Arc<dyn SummaryModel>, PipelineError> {
        if let Some(ref provider) = self.config.provider {
            return Ok(Arc::clone(provider));
        }

        if let Some(var) = self.config.credential_var() {
            let configured = std::env::var(&var)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !configured {
                return Err(PipelineError::ProviderNotConfigured {
                    provider: self.config.provider_name.clone(),
                    hint: format!("{var} not configured. Export it before enqueuing jobs."),
                });
            }
        }

        let provider =
            ProviderFactory::create_llm_provider(&self.config.provider_name, &self.config.model)
                .map_err(|e| PipelineError::ProviderNotConfigured {
                    provider: self.config.provider_name.clone(),
                    hint: format!("{e}"),
                })?;

        Ok(Arc::new(LlmSummaryModel::new(
            format!("{}/{}", self.config.provider_name, self.config.model),
            provider,
            self.config.temperature,
            self.config.max_tokens,
        )))
    }

    /// Produce briefs for `text`, filed against the subjects currently in
    /// `repository`.
    ///
    /// The subject list is fetched on every call so subjects added while the
    /// process runs are offered to the model without a restart.
    pub async fn classify(
        &self,
        text: &str,
        date: &str,
        repository: &dyn Repository,
    ) -> Result<Vec<SubjectBrief>, PipelineError> {
        let model = self.resolve_model()?;
        let subjects = repository.list_subjects().await?;
        let parts = briefing_prompt(self.config.system_prompt.as_deref(), date, &subjects, text);

        info!(
            "Summarizing {} chars against {} subjects with {}",
            text.len(),
            subjects.len(),
            model.name()
        );

        let raw = match self.config.summarize_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), model.generate(&parts))
                .await
                .map_err(|_| PipelineError::SummarizationFailed {
                    message: format!("{} timed out after {}s", model.name(), secs),
                })??,
            None => model.generate(&parts).await?,
        };

        match parse_subject_map(&raw) {
            Ok(briefs) => {
                info!("Model returned briefs for {} subjects", briefs.len());
                Ok(briefs)
            }
            Err(e) => {
                warn!("Discarding summarization output: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// Parse the model's answer into briefs, in the order the model emitted them.
///
/// Entries whose value is not a string, or is blank, are dropped.
pub fn parse_subject_map(raw: &str) -> Result<Vec<SubjectBrief>, PipelineError> {
    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(s), Some(e)) if e > s => (s, e),
        _ => {
            return Err(PipelineError::MalformedResponse {
                detail: "no JSON object found".into(),
            })
        }
    };

    let map: serde_json::Map<String, Value> = serde_json::from_str(&raw[start..=end])
        .map_err(|e| PipelineError::MalformedResponse {
            detail: e.to_string(),
        })?;

    let briefs = map
        .into_iter()
        .filter_map(|(subject, value)| match value {
            Value::String(body) if !body.trim().is_empty() => {
                Some(SubjectBrief::new(subject.trim(), body))
            }
            Value::String(_) => None,
            other => {
                warn!("Ignoring non-text brief for '{}': {}", subject, other);
                None
            }
        })
        .collect();

    Ok(briefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;

    struct ScriptedModel(String);

    #[async_trait]
    impl SummaryModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _parts: &[PromptPart]) -> Result<String, PipelineError> {
            Ok(self.0.clone())
        }
    }

    struct SlowModel;

    #[async_trait]
    impl SummaryModel for SlowModel {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _parts: &[PromptPart]) -> Result<String, PipelineError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".into())
        }
    }

    fn classifier_with(model: Arc<dyn SummaryModel>) -> SubjectClassifier {
        SubjectClassifier::new(PipelineConfig::builder().provider(model).build().unwrap())
    }

    #[test]
    fn parses_plain_object() {
        let briefs = parse_subject_map(r#"{"Economy": "- bullet one"}"#).unwrap();
        assert_eq!(briefs, vec![SubjectBrief::new("Economy", "- bullet one")]);
    }

    #[test]
    fn parses_object_wrapped_in_prose_and_fences() {
        let raw = "Here you go:\n```json\n{\"Economy\":\"- a\",\"Environment\":\"- b\"}\n```\nDone.";
        let briefs = parse_subject_map(raw).unwrap();
        let names: Vec<_> = briefs.iter().map(|b| b.subject.as_str()).collect();
        assert_eq!(names, vec!["Economy", "Environment"]);
    }

    #[test]
    fn drops_blank_and_non_text_briefs() {
        let briefs = parse_subject_map(r#"{"Economy":"  ","History":["x"],"Geography":"- rivers"}"#)
            .unwrap();
        assert_eq!(briefs, vec![SubjectBrief::new("Geography", "- rivers")]);
    }

    #[test]
    fn no_braces_is_malformed() {
        let err = parse_subject_map("I could not find any subjects.").unwrap_err();
        assert!(!err.is_fatal());
        assert!(parse_subject_map("} backwards {").is_err());
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            parse_subject_map("{Economy: - bullet}"),
            Err(PipelineError::MalformedResponse { .. })
        ));
        assert!(parse_subject_map(r#"{"a": 1} trailing {"b": 2}"#).is_err());
    }

    #[tokio::test]
    async fn unparseable_answer_degrades_to_no_briefs() {
        let repo = MemoryRepository::new();
        let classifier = classifier_with(Arc::new(ScriptedModel("sorry, no JSON".into())));
        let briefs = classifier.classify("text", "2024-03-01", &repo).await.unwrap();
        assert!(briefs.is_empty());
    }

    #[tokio::test]
    async fn missing_credential_fails_before_calling_model() {
        let repo = MemoryRepository::new();
        let config = PipelineConfig::builder()
            .credential_env("NEWSBRIEF_TEST_UNSET_CREDENTIAL")
            .build()
            .unwrap();
        let err = SubjectClassifier::new(config)
            .classify("text", "2024-03-01", &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProviderNotConfigured { .. }));
        assert!(err.to_string().contains("NEWSBRIEF_TEST_UNSET_CREDENTIAL"));
    }

    #[test]
    fn missing_credential_names_the_providers_variable() {
        if std::env::var("MISTRAL_API_KEY").is_ok() {
            return;
        }
        let config = PipelineConfig::builder()
            .provider_name("mistral")
            .model("mistral-small-latest")
            .build()
            .unwrap();
        let err = SubjectClassifier::new(config).resolve_model().err().unwrap();
        let msg = err.to_string();
        assert!(matches!(err, PipelineError::ProviderNotConfigured { .. }));
        assert!(msg.contains("MISTRAL_API_KEY"), "got: {msg}");
        assert!(!msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn keyless_provider_skips_credential_check() {
        let config = PipelineConfig::builder()
            .provider_name("ollama")
            .model("llama3")
            .build()
            .unwrap();
        // Any failure here comes from provider construction, never from a
        // missing credential variable.
        if let Err(err) = SubjectClassifier::new(config).resolve_model() {
            assert!(!err.to_string().contains("_API_KEY"), "got: {err}");
        }
    }

    #[tokio::test]
    async fn timeout_is_a_summarization_failure() {
        let repo = MemoryRepository::new();
        let config = PipelineConfig::builder()
            .provider(Arc::new(SlowModel))
            .summarize_timeout_secs(1)
            .build()
            .unwrap();
        let err = SubjectClassifier::new(config)
            .classify("text", "2024-03-01", &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::SummarizationFailed { .. }));
        assert!(err.to_string().contains("timed out after 1s"));
    }
}
