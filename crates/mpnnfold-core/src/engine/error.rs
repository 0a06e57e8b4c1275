use super::config::ConfigError;
use crate::core::utils::identifiers::IdentifierError;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("Invalid configuration: {0}")]
    Config(ConfigError),

    #[error("Failed to fetch '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: BoxedError,
    },

    #[error("Failed to extract archive '{archive}': {source}", archive = archive.display())]
    Extraction {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{adapter} failed: {message}")]
    Adapter {
        adapter: &'static str,
        message: String,
    },

    #[error("Failed to write '{path}': {source}", path = path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: BoxedError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn adapter(adapter: &'static str, message: impl Into<String>) -> Self {
        Self::Adapter {
            adapter,
            message: message.into(),
        }
    }

    pub fn output(path: impl Into<PathBuf>, source: impl Into<BoxedError>) -> Self {
        Self::Output {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidIdentifier(id) => Self::InvalidIdentifier(id),
            other => Self::Config(other),
        }
    }
}
