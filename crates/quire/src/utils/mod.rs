//! Utilities for quire
//!
//! - Identifier escaping and heading slugs
//! - Directory staging and atomic publishing

pub mod fs;
pub mod slug;

pub use slug::{anchor_slug, escape_refid, slug, unique_slug};
