use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} '{key}' not available in corpus")]
    NotFound { kind: &'static str, key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unexpected page layout: {0}")]
    Parse(String),

    #[error("malformed sample data: {0}")]
    Schema(String),

    #[error("request to corpus failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("crawl worker failed: {0}")]
    Worker(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// True for the failures a caller should surface as validation
    /// problems rather than crawl failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::InvalidArgument(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
