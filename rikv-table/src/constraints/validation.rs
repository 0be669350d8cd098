//! Invariant checks for resolved foreign keys.
//!
//! Every constraint in a valid collection satisfies:
//! - at least one child column and no duplicate child tag;
//! - equally many child and parent columns;
//! - its child index exists on the child table with exactly the child tags;
//! - its parent index exists on the parent table with exactly the parent tags.
//!
//! Checks report every violation found instead of stopping at the first, so a
//! merge can present all of them at once.

#![forbid(unsafe_code)]

use std::fmt;

use rustc_hash::FxHashSet;

use super::collection::ForeignKeyCollection;
use super::types::ForeignKeyConstraint;
use crate::root::Root;
use crate::table::Table;
use crate::types::{TableId, Tag};

/// Which invariant a constraint breaks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    EmptyColumns,
    DuplicateChildColumn(Tag),
    ColumnCountMismatch { child: usize, parent: usize },
    MissingChildTable(TableId),
    MissingParentTable(TableId),
    UnknownChildTag(Tag),
    UnknownParentTag(Tag),
    MissingChildIndex(String),
    ChildIndexMismatch { index: String, index_tags: Vec<Tag> },
    MissingParentIndex(String),
    ParentIndexMismatch { index: String, index_tags: Vec<Tag> },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::EmptyColumns => write!(f, "no columns"),
            ViolationKind::DuplicateChildColumn(tag) => {
                write!(f, "child column tag {tag} listed twice")
            }
            ViolationKind::ColumnCountMismatch { child, parent } => {
                write!(f, "{child} child columns but {parent} parent columns")
            }
            ViolationKind::MissingChildTable(id) => write!(f, "child table {id} does not exist"),
            ViolationKind::MissingParentTable(id) => write!(f, "parent table {id} does not exist"),
            ViolationKind::UnknownChildTag(tag) => write!(f, "child column tag {tag} does not exist"),
            ViolationKind::UnknownParentTag(tag) => {
                write!(f, "parent column tag {tag} does not exist")
            }
            ViolationKind::MissingChildIndex(index) => {
                write!(f, "child index '{index}' does not exist")
            }
            ViolationKind::ChildIndexMismatch { index, index_tags } => {
                write!(f, "child index '{index}' covers {index_tags:?}")
            }
            ViolationKind::MissingParentIndex(index) => {
                write!(f, "parent index '{index}' does not exist")
            }
            ViolationKind::ParentIndexMismatch { index, index_tags } => {
                write!(f, "parent index '{index}' covers {index_tags:?}")
            }
        }
    }
}

/// A constraint that fails one invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrityViolation {
    pub constraint: String,
    pub kind: ViolationKind,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "foreign key '{}': {}", self.constraint, self.kind)
    }
}

/// Check one constraint against the tables of `root`.
pub fn validate_foreign_key(fk: &ForeignKeyConstraint, root: &Root) -> Vec<ViolationKind> {
    let mut violations = Vec::new();

    if fk.child_columns.is_empty() {
        violations.push(ViolationKind::EmptyColumns);
    }
    let mut seen = FxHashSet::default();
    for &tag in &fk.child_columns {
        if !seen.insert(tag) {
            violations.push(ViolationKind::DuplicateChildColumn(tag));
        }
    }
    if fk.child_columns.len() != fk.parent_columns.len() {
        violations.push(ViolationKind::ColumnCountMismatch {
            child: fk.child_columns.len(),
            parent: fk.parent_columns.len(),
        });
    }

    match root.table_by_id(fk.child_table_id) {
        Some(table) => check_side(
            table,
            &fk.child_index,
            &fk.child_columns,
            Side::Child,
            &mut violations,
        ),
        None => violations.push(ViolationKind::MissingChildTable(fk.child_table_id)),
    }
    match root.table_by_id(fk.parent_table_id) {
        Some(table) => check_side(
            table,
            &fk.parent_index,
            &fk.parent_columns,
            Side::Parent,
            &mut violations,
        ),
        None => violations.push(ViolationKind::MissingParentTable(fk.parent_table_id)),
    }

    violations
}

/// Check every constraint in `collection`, in name order.
pub fn validate_collection(collection: &ForeignKeyCollection, root: &Root) -> Vec<IntegrityViolation> {
    collection
        .iter()
        .flat_map(|fk| {
            validate_foreign_key(fk, root)
                .into_iter()
                .map(|kind| IntegrityViolation {
                    constraint: fk.name.clone(),
                    kind,
                })
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Side {
    Child,
    Parent,
}

fn check_side(table: &Table, index: &str, tags: &[Tag], side: Side, out: &mut Vec<ViolationKind>) {
    let schema = table.schema();
    for &tag in tags {
        if !schema.has_tag(tag) {
            out.push(match side {
                Side::Child => ViolationKind::UnknownChildTag(tag),
                Side::Parent => ViolationKind::UnknownParentTag(tag),
            });
        }
    }
    match schema.indexes().get_by_name_case_insensitive(index) {
        Some(idx) if idx.matches_tags(tags) => {}
        Some(idx) => out.push(match side {
            Side::Child => ViolationKind::ChildIndexMismatch {
                index: idx.name().to_string(),
                index_tags: idx.tags().to_vec(),
            },
            Side::Parent => ViolationKind::ParentIndexMismatch {
                index: idx.name().to_string(),
                index_tags: idx.tags().to_vec(),
            },
        }),
        None => out.push(match side {
            Side::Child => ViolationKind::MissingChildIndex(index.to_string()),
            Side::Parent => ViolationKind::MissingParentIndex(index.to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{AddIndexRequest, CreateTableRequest, ForeignKeyDef, IndexDef, SchemaDdl};
    use crate::schema::ColumnDef;

    fn root_with_fk() -> Root {
        Root::new()
            .create_table(
                CreateTableRequest::new("parent")
                    .with_column(ColumnDef::new("id").with_tag(0))
                    .with_column(ColumnDef::new("v1").with_tag(1))
                    .with_primary_key(["id"])
                    .with_index(IndexDef::named("v1_idx", ["v1"])),
            )
            .and_then(|root| {
                root.create_table(
                    CreateTableRequest::new("child")
                        .with_column(ColumnDef::new("id").with_tag(10))
                        .with_column(ColumnDef::new("v1").with_tag(11))
                        .with_primary_key(["id"])
                        .with_foreign_key(
                            ForeignKeyDef::new(["v1"], "parent", ["v1"]).named("child_fk"),
                        ),
                )
            })
            .expect("fixture")
    }

    #[test]
    fn resolved_constraints_are_valid() {
        let root = root_with_fk();
        assert!(validate_collection(root.foreign_key_collection(), &root).is_empty());
    }

    #[test]
    fn reports_every_broken_invariant() {
        let root = root_with_fk();
        let mut fk = root.foreign_key_collection().get("child_fk").unwrap().clone();
        fk.child_columns = vec![11, 11];
        fk.parent_index = "gone".into();
        let kinds = validate_foreign_key(&fk, &root);
        assert!(kinds.contains(&ViolationKind::DuplicateChildColumn(11)));
        assert!(kinds.contains(&ViolationKind::ColumnCountMismatch { child: 2, parent: 1 }));
        assert!(kinds.contains(&ViolationKind::ChildIndexMismatch {
            index: "v1".into(),
            index_tags: vec![11],
        }));
        assert!(kinds.contains(&ViolationKind::MissingParentIndex("gone".into())));
    }

    #[test]
    fn index_with_other_tags_is_a_mismatch() {
        let root = root_with_fk()
            .add_index(AddIndexRequest::new("child", IndexDef::named("id2", ["id"])))
            .unwrap();
        let mut fk = root.foreign_key_collection().get("child_fk").unwrap().clone();
        fk.child_index = "id2".into();
        assert_eq!(
            validate_foreign_key(&fk, &root),
            vec![ViolationKind::ChildIndexMismatch {
                index: "id2".into(),
                index_tags: vec![10],
            }]
        );
    }
}
