//! Common types for the table core.

#![forbid(unsafe_code)]

pub use rikv_types::{TableId, Tag};
