//! Error types and result definitions for rikv.
//!
//! Every crate in the workspace returns [`Result<T>`], whose error variant is the
//! single [`Error`] enum. Schema and constraint operations are synchronous pure
//! functions over immutable values, so errors are always reported to the
//! immediate caller; nothing is retried internally.
//!
//! # Error Categories
//!
//! - **Lookup failures** ([`Error::UnknownTable`], [`Error::UnknownColumn`],
//!   [`Error::UnknownIndex`], [`Error::UnknownForeignKey`])
//! - **Resolution failures** ([`Error::NoMatchingParentIndex`])
//! - **Name collisions** ([`Error::DuplicateConstraintName`],
//!   [`Error::DuplicateIndexName`], [`Error::DuplicateTableName`],
//!   [`Error::DuplicateColumnName`], [`Error::DuplicateTag`])
//! - **Orphaning mutations** ([`Error::ColumnUsedByForeignKey`],
//!   [`Error::IndexUsedByForeignKey`], [`Error::TableReferencedByForeignKey`])
//! - **Merge outcomes** ([`Error::MergeConflict`],
//!   [`Error::PostMergeIntegrityViolation`])
//! - **Input, codec and internal errors** ([`Error::InvalidArgumentError`],
//!   [`Error::CatalogError`], [`Error::Internal`])

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
