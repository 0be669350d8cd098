//! Schema-level referential integrity for snapshot roots.
//!
//! A [`Root`] is an immutable value holding every [`Table`] and the
//! [`ForeignKeyCollection`] at one point in history. Every DDL operation takes a
//! root by reference and returns a new root; older roots stay valid and share
//! structure with the new one.
//!
//! # Architecture
//!
//! - [`tags`]: per-table tag allocation; tags identify columns across renames
//! - [`schema`] / [`index`]: columns, primary key and the index catalog
//! - [`table`] / [`root`]: immutable tables and the snapshot holding them
//! - [`constraints`]: foreign key records, the collection, resolution,
//!   schema-mutation policy, validation and persistence
//! - [`ddl`]: request types and the [`SchemaDdl`] entry points
//! - [`merge`]: three-way merge of named schema objects and whole roots

#![forbid(unsafe_code)]

pub mod constraints;
pub mod ddl;
pub mod index;
pub mod merge;
pub mod names;
pub mod root;
pub mod schema;
pub mod table;
pub mod tags;
pub mod types;

pub use constraints::{
    ForeignKeyAction, ForeignKeyCollection, ForeignKeyConstraint, IntegrityViolation,
    ResolvedForeignKey, ViolationKind, decode_foreign_keys, encode_foreign_keys,
    resolve_foreign_key,
};
pub use ddl::{
    AddColumnRequest, AddForeignKeyRequest, AddIndexRequest, CreateTableRequest,
    DropColumnRequest, DropForeignKeyRequest, DropIndexRequest, DropTableRequest, ForeignKeyDef,
    IndexDef, RenameColumnRequest, RenameIndexRequest, RenameTableRequest, SchemaDdl,
};
pub use index::{Index, IndexCatalog};
pub use merge::{
    ConflictKind, MergeConflict, MergeOptions, MergeSide, NamedSchemaObject, RootMerge,
    merge_foreign_keys, merge_named, merge_roots,
};
pub use names::NameKey;
pub use root::Root;
pub use schema::{Column, ColumnDef, Schema};
pub use table::Table;
pub use tags::TagSpace;
pub use types::{TableId, Tag};
