use spool_core::{CoreError, Namespace, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortenerError {
    #[error("alias already exists: {0}")]
    AliasTaken(String),
    #[error("no free {namespace} code found after {attempts} attempts")]
    NamespaceExhausted { namespace: Namespace, attempts: usize },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("url is blocked: {0}")]
    BlockedUrl(String),
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    #[error("password must be at least 8 characters and contain a letter, a digit and '@' or '.'")]
    InvalidPassword,
    #[error("max_clicks must be a positive integer")]
    InvalidMaxClicks,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidAlias(message),
        }
    }
}
