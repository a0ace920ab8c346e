use spool_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedirectError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectError {
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("password required or incorrect")]
    DenyPassword,
    #[error("click limit reached")]
    DenyLimit,
    #[error("bots are not allowed")]
    DenyBot,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RedirectError {
    /// Returns `true` for policy denials of an existing record.
    ///
    /// Callers that do not want to reveal whether a code exists can render
    /// these the same way as [`RedirectError::NotFound`].
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            RedirectError::DenyPassword | RedirectError::DenyLimit | RedirectError::DenyBot
        )
    }
}
