//! Foreign key constraints.
//!
//! - [`types`]: the resolved constraint record and referential actions
//! - [`collection`]: the persistent, name-keyed set held by a root
//! - [`resolver`]: turns a declared constraint into a resolved one
//! - [`validation`]: invariant checks used after merges and on demand
//! - [`codec`]: persisted layout

#![forbid(unsafe_code)]

pub mod codec;
pub mod collection;
pub(crate) mod mutation;
mod naming;
pub mod resolver;
pub mod types;
pub mod validation;

pub use codec::{decode_foreign_keys, encode_foreign_keys};
pub use collection::ForeignKeyCollection;
pub use resolver::{ResolvedForeignKey, resolve_foreign_key};
pub use types::{ForeignKeyAction, ForeignKeyConstraint, ForeignKeyDefinition};
pub use validation::{IntegrityViolation, ViolationKind, validate_collection, validate_foreign_key};

use crate::root::Root;

impl ForeignKeyCollection {
    /// Every invariant violation of every constraint against `root`'s tables.
    pub fn validate(&self, root: &Root) -> Vec<IntegrityViolation> {
        validate_collection(self, root)
    }
}
