use crate::error::{ConfigError, Result};
use crate::log_info;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_filename")]
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout in seconds.
    #[serde(default = "default_api_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
    /// Some hosted embedding models need `query` or `passage` here.
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityStrategy {
    /// Score each row right after it is translated.
    PerRow,
    /// Translate everything, then score in embedding batches.
    Batched,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeConfig {
    pub name: String,
    pub model: String,
    #[serde(default = "default_strategy")]
    pub strategy: SimilarityStrategy,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub reasoning_effort: Option<String>,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_sitemap")]
    pub sitemap: PathBuf,
    #[serde(default = "default_harvest_output")]
    pub output_dir: PathBuf,
    #[serde(default = "default_harvest_workers")]
    pub workers: usize,
    #[serde(default = "default_content_column")]
    pub content_column: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub logging: LogConfig,

    #[serde(default)]
    pub harvest: HarvestConfig,

    #[serde(default = "default_recipes")]
    pub recipes: Vec<RecipeConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
            filename: default_log_filename(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            timeout: default_api_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_embedding_batch_size(),
            input_type: None,
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sitemap: default_sitemap(),
            output_dir: default_harvest_output(),
            workers: default_harvest_workers(),
            content_column: default_content_column(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            reports_dir: default_reports_dir(),
            state_file: default_state_file(),
            api: ApiConfig::default(),
            embedding: EmbeddingConfig::default(),
            logging: LogConfig::default(),
            harvest: HarvestConfig::default(),
            recipes: default_recipes(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::FileRead)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;

        config.validate()?;
        log_info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Reads `path` when it exists, otherwise falls back to the built-in defaults.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::MissingField("api.base_url".to_string()).into());
        }
        if !self.api.base_url.starts_with("http") {
            return Err(ConfigError::InvalidValue(format!(
                "api.base_url must start with http(s): {}",
                self.api.base_url
            ))
            .into());
        }

        if self.api.timeout == 0 {
            return Err(
                ConfigError::InvalidValue("api.timeout must be greater than 0".to_string()).into(),
            );
        }

        if self.embedding.model.is_empty() {
            return Err(ConfigError::MissingField("embedding.model".to_string()).into());
        }

        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "embedding.batch_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.embedding.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "embedding.max_retries must be greater than 0".to_string(),
            )
            .into());
        }

        if self.harvest.workers == 0 {
            return Err(ConfigError::InvalidValue(
                "harvest.workers must be greater than 0".to_string(),
            )
            .into());
        }

        let mut seen = HashSet::new();
        for recipe in &self.recipes {
            if !seen.insert(recipe.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "recipe '{}' is defined more than once",
                    recipe.name
                ))
                .into());
            }
            if recipe.model.is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "recipes.{}.model",
                    recipe.name
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("processing_state.json")
}

fn default_api_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "NVIDIA_BUILD_API_KEY".to_string()
}

fn default_api_timeout() -> u64 {
    120
}

fn default_embedding_model() -> String {
    "nvidia/nv-embedqa-e5-v5".to_string()
}

fn default_embedding_batch_size() -> usize {
    32
}

fn default_strategy() -> SimilarityStrategy {
    SimilarityStrategy::PerRow
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.95
}

fn default_max_tokens() -> u32 {
    2024
}

fn default_requests_per_minute() -> u32 {
    38
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_recipes() -> Vec<RecipeConfig> {
    vec![
        RecipeConfig {
            name: "deepseek-v3.1".to_string(),
            model: "deepseek-ai/deepseek-v3.1".to_string(),
            strategy: SimilarityStrategy::PerRow,
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            reasoning_effort: None,
            requests_per_minute: default_requests_per_minute(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        },
        RecipeConfig {
            name: "gpt-oss-120b".to_string(),
            model: "openai/gpt-oss-120b".to_string(),
            strategy: SimilarityStrategy::Batched,
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            reasoning_effort: Some("low".to_string()),
            requests_per_minute: default_requests_per_minute(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        },
    ]
}

fn default_sitemap() -> PathBuf {
    PathBuf::from("sitemap.xml")
}

fn default_harvest_output() -> PathBuf {
    PathBuf::from("downloaded_pages")
}

fn default_harvest_workers() -> usize {
    10
}

fn default_content_column() -> String {
    "Content".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_filename() -> String {
    "pipeline.log".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.input_dir, PathBuf::from("input"));
        assert_eq!(config.state_file, PathBuf::from("processing_state.json"));
        assert_eq!(config.recipes.len(), 2);
        assert_eq!(config.recipes[1].strategy, SimilarityStrategy::Batched);
        assert_eq!(config.embedding.batch_size, 32);
    }

    #[test]
    fn recipe_tables_override_defaults() {
        let config = Config::from_toml(
            r#"
            [[recipes]]
            name = "llama"
            model = "meta/llama-3.3-70b-instruct"
            strategy = "batched"
            requests_per_minute = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.recipes.len(), 1);
        let recipe = &config.recipes[0];
        assert_eq!(recipe.name, "llama");
        assert_eq!(recipe.requests_per_minute, 10);
        assert_eq!(recipe.max_retries, 5);
        assert!((recipe.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn duplicate_recipe_names_are_rejected() {
        let result = Config::from_toml(
            r#"
            [[recipes]]
            name = "a"
            model = "m1"

            [[recipes]]
            name = "a"
            model = "m2"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let result = Config::from_toml(
            r#"
            [api]
            base_url = "ftp://example.com"
            "#,
        );
        assert!(result.is_err());
    }
}
