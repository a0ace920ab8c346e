use crate::error::StorageError;
use crate::record::{ClickEvent, ClickOutcome, ShortLinkRecord};
use crate::shortcode::StoreKey;
use async_trait::async_trait;

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable mapping from codes to [`ShortLinkRecord`]s.
///
/// The store is the single source of truth for code existence. Both
/// `create_*` operations are atomic create-if-absent: when two callers race
/// on the same code exactly one succeeds and the other receives
/// [`StorageError::Conflict`]. Counter updates are atomic per record.
///
/// The alphanumeric namespace spans two schemas. New records go to the v2
/// schema, where the alias is a field of the document; legacy records keep
/// the code as their primary key. Existence checks and creates in that
/// namespace consider both schemas.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Checks whether an alphanumeric code is claimed in either schema.
    async fn exists_alphanumeric(&self, code: &str) -> Result<bool>;

    /// Checks whether an emoji code is claimed.
    async fn exists_emoji(&self, code: &str) -> Result<bool>;

    /// Stores a v2 record under `code`. Returns `Err(Conflict)` if the code
    /// already exists in either alphanumeric schema.
    async fn create_alphanumeric(&self, code: &str, record: ShortLinkRecord) -> Result<()>;

    /// Stores an emoji record under `code`. Returns `Err(Conflict)` if the
    /// code already exists.
    async fn create_emoji(&self, code: &str, record: ShortLinkRecord) -> Result<()>;

    /// Looks up a v2 record by its alias.
    async fn lookup_v2(&self, alias: &str) -> Result<Option<ShortLinkRecord>>;

    /// Looks up a legacy record by its primary key.
    async fn lookup_legacy(&self, code: &str) -> Result<Option<ShortLinkRecord>>;

    /// Looks up an emoji record.
    async fn lookup_emoji(&self, code: &str) -> Result<Option<ShortLinkRecord>>;

    /// Atomically counts one click against the record at `key`.
    ///
    /// When `max_clicks` is set the limit is re-checked inside the same
    /// atomic step and nothing changes if it was already reached. Returns
    /// `Ok(None)` if no record exists at `key`.
    async fn increment_counters(
        &self,
        key: &StoreKey,
        click: &ClickEvent,
        max_clicks: Option<u64>,
    ) -> Result<Option<ClickOutcome>>;
}
