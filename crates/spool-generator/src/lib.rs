pub mod alphanumeric;
pub mod emoji;

use spool_core::{Namespace, ShortCode};

pub use alphanumeric::AlphanumericGenerator;
pub use emoji::EmojiGenerator;

/// Trait for generating candidate short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Candidates are only likely to be unique; uniqueness is settled by the
/// store when the record is created.
pub trait Generator: Send + Sync + 'static {
    /// The namespace every generated code belongs to.
    fn namespace(&self) -> Namespace;

    /// Generates a new random candidate code.
    fn generate(&self) -> ShortCode;
}
