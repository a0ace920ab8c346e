//! Short-link resolution.
//!
//! A requested code goes through the [`ResolutionEngine`] (namespace
//! classification and schema fallback), then the [`AccessGate`] (bot,
//! password and click-limit policy). Only an allowed request is counted
//! against the record and yields the redirect target.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use spool_redirector::{RedirectorService, ResolveRequest};
//! use spool_storage::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = RedirectorService::new(Arc::new(InMemoryStore::new()));
//!
//! let request = ResolveRequest::builder()
//!     .code("abc123")
//!     .client_ip("203.0.113.7")
//!     .build();
//! let redirect = service.resolve(request).await?;
//! println!("Redirect to: {}", redirect.target_url);
//! # Ok(())
//! # }
//! ```

pub mod bot;
pub mod engine;
pub mod error;
pub mod gate;
pub mod redirector;
pub mod service;

pub use bot::{BotClassifier, UserAgentClassifier, UNKNOWN_BOT};
pub use engine::{ResolutionEngine, ResolvedLink};
pub use error::{RedirectError, Result};
pub use gate::{AccessGate, Decision};
pub use redirector::Redirector;
pub use service::{Redirect, RedirectorService, ResolveRequest};
