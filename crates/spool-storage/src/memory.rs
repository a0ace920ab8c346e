use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use spool_core::repository::Result;
use spool_core::{ClickEvent, ClickOutcome, RecordStore, ShortLinkRecord, StorageError, StoreKey};
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Default bound on the number of client IPs kept per record.
pub const DEFAULT_RECENT_IPS_CAP: usize = 1000;

/// In-memory implementation of [`RecordStore`] using DashMap.
///
/// Each schema gets its own map. DashMap shards its locks, so concurrent
/// requests against different codes rarely contend, while every operation
/// on a single code runs under that code's shard lock. That lock is what
/// makes create-if-absent and counter increments atomic. Writes into the
/// alphanumeric namespace touch two maps, so they are additionally
/// serialized on `alphanumeric_writes`.
#[derive(Debug)]
pub struct InMemoryStore {
    v2: DashMap<String, ShortLinkRecord>,
    legacy: DashMap<String, ShortLinkRecord>,
    emoji: DashMap<String, ShortLinkRecord>,
    alphanumeric_writes: Mutex<()>,
    recent_ips_cap: usize,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::with_recent_ips_cap(DEFAULT_RECENT_IPS_CAP)
    }

    /// Creates a store that keeps at most `cap` recent IPs per record.
    /// A cap of `0` keeps every IP.
    pub fn with_recent_ips_cap(cap: usize) -> Self {
        Self {
            v2: DashMap::new(),
            legacy: DashMap::new(),
            emoji: DashMap::new(),
            alphanumeric_writes: Mutex::new(()),
            recent_ips_cap: cap,
        }
    }

    /// Writes a record under the legacy schema, keyed by its code.
    ///
    /// The engine never creates legacy records; this exists for migration
    /// tooling and fixtures. Counters on `record` are kept as they are.
    /// Returns `Err(Conflict)` if the code exists in either alphanumeric
    /// schema.
    pub fn insert_legacy(&self, record: ShortLinkRecord) -> Result<()> {
        let code = record.code.clone();
        self.claim_alphanumeric(&self.legacy, &self.v2, &code, record)
    }

    /// Number of records across all schemas.
    pub fn len(&self) -> usize {
        self.v2.len() + self.legacy.len() + self.emoji.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claims `code` in `target` unless it is taken there or in `other`.
    fn claim_alphanumeric(
        &self,
        target: &DashMap<String, ShortLinkRecord>,
        other: &DashMap<String, ShortLinkRecord>,
        code: &str,
        record: ShortLinkRecord,
    ) -> Result<()> {
        let _guard = self
            .alphanumeric_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if other.contains_key(code) {
            return Err(StorageError::Conflict(code.to_owned()));
        }
        claim(target, code, record)
    }

    fn map_for(&self, key: &StoreKey) -> &DashMap<String, ShortLinkRecord> {
        match key {
            StoreKey::V2(_) => &self.v2,
            StoreKey::Legacy(_) => &self.legacy,
            StoreKey::Emoji(_) => &self.emoji,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Inserts `record` under `code` unless the slot is taken.
fn claim(
    map: &DashMap<String, ShortLinkRecord>,
    code: &str,
    record: ShortLinkRecord,
) -> Result<()> {
    match map.entry(code.to_owned()) {
        Entry::Occupied(_) => Err(StorageError::Conflict(code.to_owned())),
        Entry::Vacant(slot) => {
            slot.insert(ShortLinkRecord {
                code: code.to_owned(),
                ..record
            });
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn exists_alphanumeric(&self, code: &str) -> Result<bool> {
        Ok(self.v2.contains_key(code) || self.legacy.contains_key(code))
    }

    async fn exists_emoji(&self, code: &str) -> Result<bool> {
        Ok(self.emoji.contains_key(code))
    }

    async fn create_alphanumeric(&self, code: &str, record: ShortLinkRecord) -> Result<()> {
        self.claim_alphanumeric(&self.v2, &self.legacy, code, record)
    }

    async fn create_emoji(&self, code: &str, record: ShortLinkRecord) -> Result<()> {
        claim(&self.emoji, code, record)
    }

    async fn lookup_v2(&self, alias: &str) -> Result<Option<ShortLinkRecord>> {
        Ok(self.v2.get(alias).map(|entry| entry.clone()))
    }

    async fn lookup_legacy(&self, code: &str) -> Result<Option<ShortLinkRecord>> {
        Ok(self.legacy.get(code).map(|entry| entry.clone()))
    }

    async fn lookup_emoji(&self, code: &str) -> Result<Option<ShortLinkRecord>> {
        Ok(self.emoji.get(code).map(|entry| entry.clone()))
    }

    async fn increment_counters(
        &self,
        key: &StoreKey,
        click: &ClickEvent,
        max_clicks: Option<u64>,
    ) -> Result<Option<ClickOutcome>> {
        let Some(mut record) = self.map_for(key).get_mut(key.code()) else {
            return Ok(None);
        };

        if max_clicks.is_some_and(|max_clicks| record.total_clicks >= max_clicks) {
            trace!(key = %key, "click limit already reached");
            return Ok(Some(ClickOutcome::LimitReached));
        }

        let total_clicks = record.record_click(click, self.recent_ips_cap);
        Ok(Some(ClickOutcome::Counted { total_clicks }))
    }
}
