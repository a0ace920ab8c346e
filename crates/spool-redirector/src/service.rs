use crate::bot::UNKNOWN_BOT;
use crate::engine::ResolutionEngine;
use crate::error::{RedirectError, Result};
use crate::gate::{AccessGate, Decision};
use crate::redirector::Redirector;
use async_trait::async_trait;
use serde::Serialize;
use spool_core::{ClickEvent, ClickOutcome, Clock, RecordStore, ShortCode, SystemClock};
use std::sync::Arc;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

/// One inbound resolution.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolveRequest {
    /// The code as it appeared in the request path, possibly percent-encoded.
    #[builder(setter(into))]
    pub code: String,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    #[builder(default)]
    pub caller_is_bot: bool,
    /// Counted under this name when `caller_is_bot` is set; defaults to
    /// [`UNKNOWN_BOT`].
    #[builder(default, setter(strip_option, into))]
    pub bot_name: Option<String>,
    #[builder(setter(into))]
    pub client_ip: String,
}

/// Where an allowed request should be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub target_url: String,
    pub code: ShortCode,
    /// Click total including this request.
    pub total_clicks: u64,
}

/// Service for handling short-link redirects.
///
/// Resolves the requested code, applies the record's access policy and,
/// for allowed requests only, counts exactly one click in the store.
pub struct RedirectorService<S, C = SystemClock> {
    engine: ResolutionEngine<S>,
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for RedirectorService<S, C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: RecordStore> RedirectorService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: RecordStore, C: Clock> RedirectorService<S, C> {
    pub fn with_clock(store: Arc<S>, clock: C) -> Self {
        Self {
            engine: ResolutionEngine::new(Arc::clone(&store)),
            store,
            clock: Arc::new(clock),
        }
    }

    pub async fn resolve(&self, request: ResolveRequest) -> Result<Redirect> {
        Redirector::resolve(self, request).await
    }
}

#[async_trait]
impl<S: RecordStore, C: Clock> Redirector for RedirectorService<S, C> {
    async fn resolve(&self, request: ResolveRequest) -> Result<Redirect> {
        let resolved = self.engine.resolve(&request.code).await?;
        let key = resolved.key;

        let decision = AccessGate::check(
            &resolved.record,
            request.password.as_deref(),
            request.caller_is_bot,
        );
        trace!(key = %key, decision = %decision, "access policy evaluated");

        match decision {
            Decision::Allow => {}
            Decision::DenyBot => return Err(RedirectError::DenyBot),
            Decision::DenyPassword => return Err(RedirectError::DenyPassword),
            Decision::DenyLimit => return Err(RedirectError::DenyLimit),
        }

        let mut click = ClickEvent::new(self.clock.now(), request.client_ip);
        if request.caller_is_bot {
            let name = request.bot_name.unwrap_or_else(|| UNKNOWN_BOT.to_string());
            click = click.with_bot(name);
        }
        let outcome = self
            .store
            .increment_counters(&key, &click, resolved.record.max_clicks)
            .await?;

        match outcome {
            Some(ClickOutcome::Counted { total_clicks }) => {
                debug!(key = %key, total_clicks, "redirecting");
                Ok(Redirect {
                    target_url: resolved.record.target_url,
                    code: key.to_short_code(),
                    total_clicks,
                })
            }
            Some(ClickOutcome::LimitReached) => {
                debug!(key = %key, "click limit reached by a concurrent request");
                Err(RedirectError::DenyLimit)
            }
            None => Err(RedirectError::NotFound(key.code().to_owned())),
        }
    }
}
