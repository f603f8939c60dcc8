use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Request error: {0}")]
    Request(#[from] rquest::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl AppError {
    /// Short category name attached to structured error logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Client(_) => "client",
            AppError::Recipe(_) => "recipe",
            AppError::State(_) => "state",
            AppError::Corpus(_) => "corpus",
            AppError::Report(_) => "report",
            AppError::Io(_) => "io",
            AppError::Csv(_) => "csv",
            AppError::Request(_) => "request",
            AppError::Serde(_) => "serde",
            AppError::Image(_) => "image",
            AppError::Pattern(_) => "pattern",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration: {0}")]
    MissingField(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build client: {0}")]
    BuildError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Response error {status_code}: {message}")]
    ResponseError { status_code: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Duplicate recipe name: {0}")]
    Duplicate(String),

    #[error("Invalid recipe '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Row count changed: expected {expected}, got {got}")]
    RowCountMismatch { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Line {line} has {got} fields, header has {expected}")]
    ExtraFields { line: u64, expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove state file {path}: {source}")]
    Remove {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Chart has no data: {0}")]
    EmptyChart(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
