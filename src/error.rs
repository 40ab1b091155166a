use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a crawl stage.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("required setting '{0}' is not set")]
    ConfigurationMissing(&'static str),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("fetch failed for {url}: {message}")]
    FetchFailure { url: String, message: String },
    #[error("malformed input {}: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },
    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    pub fn fetch(url: &str, message: impl ToString) -> Self {
        CrawlError::FetchFailure {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
