use crate::error::{Result, ShortenerError};
use spool_core::{ShortCode, StorageError};
use spool_generator::Generator;
use std::future::Future;
use tracing::{error, trace, warn};
use typed_builder::TypedBuilder;

/// Default ceiling on generate-and-check rounds per request.
pub const DEFAULT_MAX_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct AllocatorSettings {
    /// Candidates tried before giving up with
    /// [`ShortenerError::NamespaceExhausted`]. Zero is treated as one.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Finds unclaimed codes.
///
/// The existence check and the later create are separate store calls, so a
/// code returned here can still be lost to a concurrent writer. Callers must
/// treat a create conflict as a signal to allocate again.
#[derive(Debug, Clone, Copy, Default)]
pub struct Allocator {
    settings: AllocatorSettings,
}

impl Allocator {
    pub fn new(settings: AllocatorSettings) -> Self {
        Self { settings }
    }

    pub fn max_attempts(&self) -> usize {
        self.settings.max_attempts.max(1)
    }

    /// Samples `generator` until `exists` reports a free code.
    pub async fn allocate<E, Fut>(
        &self,
        generator: &dyn Generator,
        mut exists: E,
    ) -> Result<ShortCode>
    where
        E: FnMut(String) -> Fut,
        Fut: Future<Output = std::result::Result<bool, StorageError>>,
    {
        let namespace = generator.namespace();
        let attempts = self.max_attempts();

        for attempt in 1..=attempts {
            let candidate = generator.generate();
            if !exists(candidate.as_str().to_owned()).await? {
                trace!(code = %candidate, namespace = %namespace, attempt, "allocated code");
                return Ok(candidate);
            }
            warn!(
                code = %candidate,
                namespace = %namespace,
                attempt,
                "generated code already taken"
            );
        }

        error!(namespace = %namespace, attempts, "namespace exhausted");
        Err(ShortenerError::NamespaceExhausted {
            namespace,
            attempts,
        })
    }

    /// Checks a caller-supplied alias once. Aliases are never retried.
    pub async fn claim_alias<Fut>(&self, alias: ShortCode, exists: Fut) -> Result<ShortCode>
    where
        Fut: Future<Output = std::result::Result<bool, StorageError>>,
    {
        if exists.await? {
            return Err(ShortenerError::AliasTaken(alias.to_string()));
        }
        Ok(alias)
    }
}
