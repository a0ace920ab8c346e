//! Core types and traits for the spool short-link engine.
//!
//! This crate provides the types shared by the shortener (allocation) and
//! the redirector (resolution) sides, plus the [`RecordStore`] contract
//! both of them consume.

pub mod clock;
pub mod emoji;
pub mod error;
pub mod record;
pub mod repository;
pub mod shortcode;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, StorageError};
pub use record::{ClickEvent, ClickOutcome, ShortLinkRecord};
pub use repository::RecordStore;
pub use shortcode::{Namespace, ShortCode, StoreKey, MAX_ALIAS_LENGTH};
