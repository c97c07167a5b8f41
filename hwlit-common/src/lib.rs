//! # hwlit Common Library
//!
//! Shared code for the literature curation pipeline:
//! - Paper record model and tag vocabulary
//! - Record store with atomic file replace
//! - Bootstrap configuration and credential resolution
//! - Timestamp codec for `published` fields

pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use record::{PaperRecord, Tag};
