use crate::error::{RedirectError, Result};
use spool_core::emoji::is_emoji_sequence;
use spool_core::{Namespace, RecordStore, ShortLinkRecord, StoreKey};
use std::sync::Arc;
use tracing::{debug, trace};

/// A record together with the location it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub key: StoreKey,
    pub record: ShortLinkRecord,
}

/// Finds the record a requested code refers to.
///
/// Emoji-only codes are looked up in the emoji namespace. Everything else
/// is alphanumeric, where the v2 schema is consulted first and the legacy
/// schema second, so records written before the migration stay reachable.
#[derive(Debug)]
pub struct ResolutionEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for ResolutionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// Percent-decodes a requested code. Invalid UTF-8 is replaced, so such
/// codes simply fail to match anything.
pub fn decode_code(requested: &str) -> String {
    let decoded = urlencoding::decode_binary(requested.as_bytes());
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Namespace a decoded code belongs to.
pub fn classify(code: &str) -> Namespace {
    if is_emoji_sequence(code) {
        Namespace::Emoji
    } else {
        Namespace::Alphanumeric
    }
}

impl<S: RecordStore> ResolutionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, requested_code: &str) -> Result<ResolvedLink> {
        let code = decode_code(requested_code);
        if code.is_empty() {
            return Err(RedirectError::NotFound(code));
        }

        let namespace = classify(&code);
        trace!(code = %code, namespace = %namespace, "resolving short code");

        let found = match namespace {
            Namespace::Emoji => self
                .store
                .lookup_emoji(&code)
                .await?
                .map(|record| (StoreKey::Emoji(code.clone()), record)),
            Namespace::Alphanumeric => match self.store.lookup_v2(&code).await? {
                Some(record) => Some((StoreKey::V2(code.clone()), record)),
                None => {
                    trace!(code = %code, "not in v2 schema, trying legacy");
                    self.store
                        .lookup_legacy(&code)
                        .await?
                        .map(|record| (StoreKey::Legacy(code.clone()), record))
                }
            },
        };

        match found {
            Some((key, record)) => {
                debug!(key = %key, "resolved short code");
                Ok(ResolvedLink { key, record })
            }
            None => {
                trace!(code = %code, "short code not found");
                Err(RedirectError::NotFound(code))
            }
        }
    }
}
