//! rikv: schema-level referential integrity for versioned, snapshot-based
//! relational stores.
//!
//! This crate is the entry point of the workspace. It re-exports the schema
//! model, the foreign key subsystem and the error types from the underlying
//! `rikv-*` crates.
//!
//! # Quick Start
//!
//! ```rust
//! use rikv::{ColumnDef, CreateTableRequest, ForeignKeyDef, IndexDef, Root, SchemaDdl};
//!
//! let root = Root::new()
//!     .create_table(
//!         CreateTableRequest::new("parent")
//!             .with_column("id")
//!             .with_column("v1")
//!             .with_primary_key(["id"])
//!             .with_index(IndexDef::named("v1_idx", ["v1"])),
//!     )?
//!     .create_table(
//!         CreateTableRequest::new("child")
//!             .with_column(ColumnDef::new("id"))
//!             .with_column(ColumnDef::new("v1"))
//!             .with_primary_key(["id"])
//!             .with_foreign_key(ForeignKeyDef::new(["v1"], "parent", ["v1"]).named("child_fk")),
//!     )?;
//!
//! let fk = root.foreign_key_collection().get("child_fk").unwrap();
//! assert_eq!(fk.child_index, "v1");
//! assert_eq!(fk.parent_index, "v1_idx");
//! # Ok::<(), rikv::Error>(())
//! ```
//!
//! # Architecture
//!
//! - **Errors** (`rikv-result`): one [`Error`] enum and the [`Result`] alias.
//! - **Identifiers** (`rikv-types`): [`Tag`], [`TableId`] and reserved values.
//! - **Schema and constraints** (`rikv-table`): tag spaces, index catalogs,
//!   tables, snapshot roots, foreign key resolution, schema-mutation policy,
//!   persistence and three-way merge.

#![forbid(unsafe_code)]

pub use rikv_result::{Error, Result};
pub use rikv_types::reserved;

pub use rikv_table::*;
