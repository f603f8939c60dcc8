use super::Recipe;
use crate::client::{ChatMessage, ChatModel, ChatRequest};
use crate::config::{RecipeConfig, SimilarityStrategy};
use crate::corpus::{Corpus, SIMILARITY_COLUMN, TRANSLATED_COLUMN};
use crate::error::{RecipeError, Result};
use crate::language::LanguagePair;
use crate::similarity::{batch_similarity, calculate_similarity, Embedder};
use crate::{log_debug, log_info, log_warn};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub name: String,
    pub model: String,
    pub strategy: SimilarityStrategy,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub reasoning_effort: Option<String>,
    /// Pause between consecutive requests; derived from requests per minute.
    pub request_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub batch_size: usize,
}

impl LlmSettings {
    pub fn from_config(config: &RecipeConfig, batch_size: usize) -> Result<Self> {
        let invalid = |reason: &str| RecipeError::Invalid {
            name: config.name.clone(),
            reason: reason.to_string(),
        };

        if config.model.trim().is_empty() {
            return Err(invalid("model must not be empty").into());
        }
        if config.requests_per_minute == 0 {
            return Err(invalid("requests_per_minute must be greater than 0").into());
        }
        if config.max_retries == 0 {
            return Err(invalid("max_retries must be greater than 0").into());
        }
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(invalid("temperature must be within 0..=2").into());
        }
        if !(0.0..=1.0).contains(&config.top_p) {
            return Err(invalid("top_p must be within 0..=1").into());
        }

        Ok(Self {
            name: config.name.clone(),
            model: config.model.clone(),
            strategy: config.strategy,
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            reasoning_effort: config.reasoning_effort.clone(),
            request_interval: Duration::from_secs_f64(60.0 / config.requests_per_minute as f64),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay),
            batch_size: batch_size.max(1),
        })
    }
}

pub fn build_prompt(text: &str, pair: &LanguagePair) -> String {
    format!(
        "Translate the following {} text into {} and return ONLY the translation inside square brackets:\n\n{}",
        pair.source_name(),
        pair.target_name(),
        text
    )
}

fn bracket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\[(.*?)\]").unwrap())
}

/// The first bracketed substring, trimmed; the whole trimmed response when
/// there are no brackets.
pub fn extract_translation(response: &str) -> String {
    match bracket_pattern().captures(response) {
        Some(caps) => caps[1].trim().to_string(),
        None => response.trim().to_string(),
    }
}

/// Translation through a chat-completion model, scored with sentence embeddings.
pub struct LlmRecipe {
    settings: LlmSettings,
    chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
}

impl LlmRecipe {
    pub fn new(
        settings: LlmSettings,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            settings,
            chat,
            embedder,
        }
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn request(&self, text: &str, pair: &LanguagePair) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::user(build_prompt(text, pair))],
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            max_tokens: self.settings.max_tokens,
            reasoning_effort: self.settings.reasoning_effort.clone(),
            stream: false,
        }
    }

    /// Never fails: after the last retry the translation is empty.
    pub async fn translate(&self, text: &str, pair: &LanguagePair) -> String {
        let request = self.request(text, pair);
        let max_retries = self.settings.max_retries;

        for attempt in 1..=max_retries {
            match self.chat.complete(&request).await {
                Ok(response) => return extract_translation(&response),
                Err(e) => {
                    log_warn!(
                        "[{}] Attempt {}/{} failed for text '{}': {}",
                        self.settings.name,
                        attempt,
                        max_retries,
                        preview(text),
                        e
                    );
                    if attempt < max_retries {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }

        String::new()
    }
}

#[async_trait]
impl Recipe for LlmRecipe {
    fn name(&self) -> &str {
        &self.settings.name
    }

    async fn process(&self, mut corpus: Corpus, pair: &LanguagePair) -> Result<Corpus> {
        let (texts, references): (Vec<String>, Vec<String>) = corpus
            .units()?
            .into_iter()
            .map(|u| (u.text.to_string(), u.reference.unwrap_or_default().to_string()))
            .unzip();
        let total = texts.len();

        log_info!(
            "[{}] Translating {} rows with {} ({:?} similarity, {:.2}s between requests)",
            self.settings.name,
            total,
            self.settings.model,
            self.settings.strategy,
            self.settings.request_interval.as_secs_f64()
        );

        let mut translations = Vec::with_capacity(total);
        let mut scores = vec![0.0f64; total];

        for (i, text) in texts.iter().enumerate() {
            log_debug!(
                "[{}] Translating {}/{}: {}",
                self.settings.name,
                i + 1,
                total,
                preview(text)
            );

            let translation = self.translate(text, pair).await;
            let per_row = self.settings.strategy == SimilarityStrategy::PerRow;
            if translation.is_empty() {
                log_warn!("[{}] Translation failed for row {}", self.settings.name, i + 1);
            } else if per_row && !references[i].is_empty() {
                scores[i] =
                    calculate_similarity(self.embedder.as_ref(), &translation, &references[i])
                        .await;
                log_debug!(
                    "[{}] Similarity with reference: {:.4}",
                    self.settings.name,
                    scores[i]
                );
            }
            translations.push(translation);

            if i + 1 < total {
                tokio::time::sleep(self.settings.request_interval).await;
            }
        }

        if self.settings.strategy == SimilarityStrategy::Batched {
            scores = batch_similarity(
                self.embedder.as_ref(),
                &translations,
                &references,
                self.settings.batch_size,
            )
            .await;
        }

        corpus.set_column(TRANSLATED_COLUMN, translations)?;
        corpus.set_column(
            SIMILARITY_COLUMN,
            scores.iter().map(|s| s.to_string()).collect(),
        )?;

        log_info!("[{}] Translation process completed", self.settings.name);
        Ok(corpus)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ClientError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned completions; `None` entries become request errors.
    struct ScriptedChat {
        replies: Mutex<VecDeque<Option<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[0].content.clone());
            match self.replies.lock().unwrap().pop_front().flatten() {
                Some(reply) => Ok(reply),
                None => Err(AppError::Client(ClientError::RequestFailed("boom".into()))),
            }
        }
    }

    struct ExactEmbedder;

    #[async_trait]
    impl Embedder for ExactEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(inputs
                .iter()
                .map(|s| if s == "Bonjour" { vec![1.0, 0.0] } else { vec![0.6, 0.8] })
                .collect())
        }
    }

    fn settings(strategy: SimilarityStrategy, max_retries: u32) -> LlmSettings {
        LlmSettings {
            name: "test".into(),
            model: "m".into(),
            strategy,
            temperature: 0.3,
            top_p: 0.95,
            max_tokens: 64,
            reasoning_effort: None,
            request_interval: Duration::ZERO,
            max_retries,
            retry_delay: Duration::ZERO,
            batch_size: 32,
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(
            vec!["text".into(), "ref".into()],
            vec![
                vec!["Hello".into(), "Bonjour".into()],
                vec!["Thanks".into(), "".into()],
            ],
        )
    }

    #[test]
    fn extracts_first_bracketed_substring() {
        assert_eq!(extract_translation("noise [Bonjour] noise"), "Bonjour");
        assert_eq!(extract_translation("[ a ] and [b]"), "a");
        assert_eq!(extract_translation("[multi\nline]"), "multi\nline");
    }

    #[test]
    fn falls_back_to_trimmed_response() {
        assert_eq!(extract_translation("Bonjour"), "Bonjour");
        assert_eq!(extract_translation("  Bonjour \n"), "Bonjour");
        assert_eq!(extract_translation("unclosed [bracket"), "unclosed [bracket");
    }

    #[test]
    fn prompt_names_both_languages() {
        let prompt = build_prompt("Hello", &LanguagePair::new("en", "tw"));
        assert!(prompt.starts_with("Translate the following English text into Twi"));
        assert!(prompt.ends_with("\n\nHello"));
    }

    #[test]
    fn request_interval_follows_rate_limit() {
        let config = crate::config::Config::default().recipes[0].clone();
        let settings = LlmSettings::from_config(&config, 32).unwrap();
        let secs = settings.request_interval.as_secs_f64();
        assert!((secs - 60.0 / 38.0).abs() < 1e-9);
    }

    #[test]
    fn zero_rate_is_invalid() {
        let mut config = crate::config::Config::default().recipes[0].clone();
        config.requests_per_minute = 0;
        assert!(LlmSettings::from_config(&config, 32).is_err());
    }

    #[tokio::test]
    async fn retries_then_degrades_to_empty() {
        let chat = Arc::new(ScriptedChat::new(vec![None, None, None]));
        let recipe = LlmRecipe::new(
            settings(SimilarityStrategy::PerRow, 3),
            chat.clone(),
            Arc::new(ExactEmbedder),
        );
        let out = recipe.translate("Hello", &LanguagePair::new("en", "fr")).await;
        assert_eq!(out, "");
        assert_eq!(chat.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn retry_recovers_after_transient_failure() {
        let chat = Arc::new(ScriptedChat::new(vec![None, Some("[Bonjour]")]));
        let recipe = LlmRecipe::new(
            settings(SimilarityStrategy::PerRow, 5),
            chat.clone(),
            Arc::new(ExactEmbedder),
        );
        let out = recipe.translate("Hello", &LanguagePair::new("en", "fr")).await;
        assert_eq!(out, "Bonjour");
        assert_eq!(chat.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn per_row_scores_only_rows_with_reference() {
        let chat = Arc::new(ScriptedChat::new(vec![Some("[Bonjour]"), Some("[Merci]")]));
        let recipe = LlmRecipe::new(
            settings(SimilarityStrategy::PerRow, 1),
            chat,
            Arc::new(ExactEmbedder),
        );
        let out = recipe
            .process(corpus(), &LanguagePair::new("en", "fr"))
            .await
            .unwrap();

        assert_eq!(out.column("translated").unwrap(), vec!["Bonjour", "Merci"]);
        let scores = out.column("similarity_score").unwrap();
        assert_eq!(scores[0].parse::<f64>().unwrap(), 1.0);
        assert_eq!(scores[1].parse::<f64>().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn batched_scores_after_translating_everything() {
        let chat = Arc::new(ScriptedChat::new(vec![Some("Salut"), None]));
        let recipe = LlmRecipe::new(
            settings(SimilarityStrategy::Batched, 1),
            chat,
            Arc::new(ExactEmbedder),
        );
        let out = recipe
            .process(corpus(), &LanguagePair::new("en", "fr"))
            .await
            .unwrap();

        assert_eq!(out.column("translated").unwrap(), vec!["Salut", ""]);
        let scores: Vec<f64> = out
            .column("similarity_score")
            .unwrap()
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert!((scores[0] - 0.6).abs() < 1e-6);
        assert_eq!(scores[1], 0.0);
    }

    #[tokio::test]
    async fn missing_text_column_is_an_error() {
        let recipe = LlmRecipe::new(
            settings(SimilarityStrategy::PerRow, 1),
            Arc::new(ScriptedChat::new(vec![])),
            Arc::new(ExactEmbedder),
        );
        let corpus = Corpus::new(vec!["sentence".into()], vec![vec!["x".into()]]);
        assert!(recipe
            .process(corpus, &LanguagePair::new("en", "fr"))
            .await
            .is_err());
    }
}
