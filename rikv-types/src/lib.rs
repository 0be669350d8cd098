//! Identifiers shared across rikv crates.
//!
//! These types live in `rikv-types` so they can be reused without depending on
//! the schema or constraint crates.

#![forbid(unsafe_code)]

pub mod ids;
pub mod reserved;

pub use ids::{TableId, Tag};
