use crate::allocator::{Allocator, AllocatorSettings};
use crate::error::{Result, ShortenerError};
use crate::validation::{DefaultValidator, LinkValidator};
use spool_core::{
    Clock, Namespace, RecordStore, ShortCode, ShortLinkRecord, StorageError, SystemClock,
};
use spool_generator::{AlphanumericGenerator, EmojiGenerator, Generator};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct ShortenerSettings {
    /// Number of emoji in a generated emoji code.
    #[builder(default = spool_generator::emoji::DEFAULT_LENGTH)]
    pub emoji_length: usize,
    #[builder(default)]
    pub allocator: AllocatorSettings,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Input of [`ShortenerService::create_short_link`] and
/// [`ShortenerService::create_emoji_link`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct CreateLinkRequest {
    #[builder(setter(into))]
    pub target_url: String,
    /// Caller-chosen code; alphanumeric or emoji depending on the operation.
    #[builder(default, setter(strip_option, into))]
    pub alias: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    #[builder(default, setter(strip_option))]
    pub max_clicks: Option<u64>,
    #[builder(default)]
    pub block_bots: bool,
    #[builder(setter(into))]
    pub creator_ip: String,
}

/// A successfully created link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
    pub code: ShortCode,
}

impl CreatedLink {
    pub fn namespace(&self) -> Namespace {
        self.code.namespace()
    }
}

/// Creates short links.
///
/// Codes come either from the caller (aliases, checked once) or from the
/// namespace's generator (retried until a free code is found). Either way
/// the store's atomic create decides who owns the code: a generated code
/// lost to a concurrent writer is replaced with a fresh one, a lost alias
/// surfaces as [`ShortenerError::AliasTaken`].
pub struct ShortenerService<S, V = DefaultValidator, C = SystemClock> {
    store: Arc<S>,
    validator: Arc<V>,
    clock: Arc<C>,
    alphanumeric: Arc<dyn Generator>,
    emoji: Arc<dyn Generator>,
    allocator: Allocator,
}

impl<S, V, C> Clone for ShortenerService<S, V, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            validator: Arc::clone(&self.validator),
            clock: Arc::clone(&self.clock),
            alphanumeric: Arc::clone(&self.alphanumeric),
            emoji: Arc::clone(&self.emoji),
            allocator: self.allocator,
        }
    }
}

impl<S: RecordStore> ShortenerService<S> {
    /// Creates a service with OS-seeded generators, the default validator
    /// and the system clock.
    pub fn new(store: Arc<S>, settings: ShortenerSettings) -> Self {
        Self::with_parts(store, DefaultValidator::new(), SystemClock, settings)
    }
}

impl<S: RecordStore, V: LinkValidator, C: Clock> ShortenerService<S, V, C> {
    pub fn with_parts(store: Arc<S>, validator: V, clock: C, settings: ShortenerSettings) -> Self {
        Self {
            store,
            validator: Arc::new(validator),
            clock: Arc::new(clock),
            alphanumeric: Arc::new(AlphanumericGenerator::new()),
            emoji: Arc::new(EmojiGenerator::new().with_length(settings.emoji_length)),
            allocator: Allocator::new(settings.allocator),
        }
    }

    /// Replaces the code generators, e.g. with seeded ones.
    pub fn with_generators<A, E>(mut self, alphanumeric: A, emoji: E) -> Self
    where
        A: Generator,
        E: Generator,
    {
        self.alphanumeric = Arc::new(alphanumeric);
        self.emoji = Arc::new(emoji);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates a link in the alphanumeric namespace.
    ///
    /// A caller alias is truncated to 16 characters before it is checked.
    pub async fn create_short_link(&self, request: CreateLinkRequest) -> Result<CreatedLink> {
        trace!(target_url = %request.target_url, alias = ?request.alias, "creating short link");
        self.validate(&request)?;
        let alias = request.alias.as_deref().map(ShortCode::alias).transpose()?;
        self.create(Namespace::Alphanumeric, alias, request).await
    }

    /// Creates a link in the emoji namespace.
    pub async fn create_emoji_link(&self, request: CreateLinkRequest) -> Result<CreatedLink> {
        trace!(target_url = %request.target_url, alias = ?request.alias, "creating emoji link");
        self.validate(&request)?;
        let alias = request.alias.clone().map(ShortCode::emoji).transpose()?;
        self.create(Namespace::Emoji, alias, request).await
    }

    fn validate(&self, request: &CreateLinkRequest) -> Result<()> {
        if !self.validator.is_valid_url(&request.target_url) {
            return Err(ShortenerError::InvalidUrl(request.target_url.clone()));
        }
        if self.validator.is_blocked_url(&request.target_url) {
            return Err(ShortenerError::BlockedUrl(request.target_url.clone()));
        }
        if let Some(password) = &request.password {
            if !self.validator.is_valid_password(password) {
                return Err(ShortenerError::InvalidPassword);
            }
        }
        if request.max_clicks == Some(0) {
            return Err(ShortenerError::InvalidMaxClicks);
        }
        Ok(())
    }

    async fn create(
        &self,
        namespace: Namespace,
        alias: Option<ShortCode>,
        request: CreateLinkRequest,
    ) -> Result<CreatedLink> {
        let record = ShortLinkRecord::builder()
            .code("")
            .target_url(request.target_url)
            .password(request.password)
            .max_clicks(request.max_clicks)
            .block_bots(request.block_bots)
            .created_at(self.clock.now())
            .creator_ip(request.creator_ip)
            .build();

        if let Some(alias) = alias {
            let exists = self.exists(namespace, alias.as_str().to_owned());
            let code = self.allocator.claim_alias(alias, exists).await?;
            return self.insert_alias(code, record).await;
        }

        self.insert_generated(namespace, record).await
    }

    async fn insert_alias(&self, code: ShortCode, record: ShortLinkRecord) -> Result<CreatedLink> {
        match self.insert(&code, record).await {
            Ok(()) => {
                debug!(
                    code = %code,
                    namespace = %code.namespace(),
                    "created link from alias"
                );
                Ok(CreatedLink { code })
            }
            Err(StorageError::Conflict(_)) => {
                warn!(code = %code, "alias claimed by a concurrent request");
                Err(ShortenerError::AliasTaken(code.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn insert_generated(
        &self,
        namespace: Namespace,
        record: ShortLinkRecord,
    ) -> Result<CreatedLink> {
        let generator = match namespace {
            Namespace::Alphanumeric => self.alphanumeric.as_ref(),
            Namespace::Emoji => self.emoji.as_ref(),
        };
        let attempts = self.allocator.max_attempts();

        for _ in 0..attempts {
            let code = self
                .allocator
                .allocate(generator, |candidate| self.exists(namespace, candidate))
                .await?;

            match self.insert(&code, record.clone()).await {
                Ok(()) => {
                    debug!(code = %code, namespace = %namespace, "created link");
                    return Ok(CreatedLink { code });
                }
                Err(StorageError::Conflict(_)) => {
                    warn!(
                        code = %code,
                        namespace = %namespace,
                        "lost create race, allocating again"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        error!(namespace = %namespace, attempts, "every allocated code lost its create race");
        Err(ShortenerError::NamespaceExhausted {
            namespace,
            attempts,
        })
    }

    async fn exists(
        &self,
        namespace: Namespace,
        code: String,
    ) -> std::result::Result<bool, StorageError> {
        match namespace {
            Namespace::Alphanumeric => self.store.exists_alphanumeric(&code).await,
            Namespace::Emoji => self.store.exists_emoji(&code).await,
        }
    }

    async fn insert(
        &self,
        code: &ShortCode,
        record: ShortLinkRecord,
    ) -> std::result::Result<(), StorageError> {
        let record = ShortLinkRecord {
            code: code.as_str().to_owned(),
            ..record
        };
        match code {
            ShortCode::Alphanumeric(code) => self.store.create_alphanumeric(code, record).await,
            ShortCode::Emoji(code) => self.store.create_emoji(code, record).await,
        }
    }
}
