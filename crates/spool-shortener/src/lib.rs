//! Short-link allocation.
//!
//! This crate turns a create request into a stored [`ShortLinkRecord`]:
//! it validates the request, picks a free code in the requested namespace
//! (caller alias or generated) and claims it in the [`RecordStore`].
//!
//! [`ShortLinkRecord`]: spool_core::ShortLinkRecord
//! [`RecordStore`]: spool_core::RecordStore

pub mod allocator;
pub mod error;
pub mod service;
pub mod validation;

pub use allocator::{Allocator, AllocatorSettings};
pub use error::ShortenerError;
pub use service::{CreateLinkRequest, CreatedLink, ShortenerService, ShortenerSettings};
pub use validation::{DefaultValidator, LinkValidator};
