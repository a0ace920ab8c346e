use crate::service::{Redirect, ResolveRequest};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a requested code to its redirect target, counting the click.
    ///
    /// Denials and unknown codes are returned as distinct errors.
    async fn resolve(&self, request: ResolveRequest) -> Result<Redirect>;
}
