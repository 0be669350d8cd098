//! Foreign key resolution.
//!
//! Resolution turns a declared constraint (column names as written in DDL)
//! into a [`ForeignKeyConstraint`] that records tags and concrete index names:
//!
//! 1. Column names are translated to tags through each table's current schema.
//! 2. The child side reuses an index whose tag sequence equals the requested
//!    tags exactly, or synthesizes one named after the column(s).
//! 3. The parent side must already have such an index; it is never
//!    synthesized.
//! 4. An explicit name is checked for uniqueness; otherwise a generated token
//!    is assigned.
//!
//! Self-referencing constraints (child and parent are the same table) take
//! the same path.

#![forbid(unsafe_code)]

use rikv_result::{Error, Result};

use super::naming::{NameSeed, generate_constraint_name};
use super::types::ForeignKeyConstraint;
use crate::ddl::AddForeignKeyRequest;
use crate::index::Index;
use crate::names::NameKey;
use crate::root::Root;
use crate::table::{Table, ensure_distinct};
use crate::types::Tag;

/// Outcome of resolving a foreign key against a root.
#[derive(Clone, Debug)]
pub struct ResolvedForeignKey {
    /// New root holding the constraint and any synthesized child index.
    pub root: Root,
    pub constraint: ForeignKeyConstraint,
    /// Name of the child index created for this constraint, if any.
    pub synthesized_index: Option<String>,
}

/// Resolve `request` against `root` and insert the result into a new root.
///
/// `root` itself is never modified; on error nothing observable changes.
pub fn resolve_foreign_key(root: &Root, request: &AddForeignKeyRequest) -> Result<ResolvedForeignKey> {
    let def = &request.foreign_key;
    if def.columns.is_empty() {
        return Err(Error::InvalidArgumentError(
            "FOREIGN KEY requires at least one referencing column".into(),
        ));
    }
    if def.columns.len() != def.parent_columns.len() {
        return Err(Error::InvalidArgumentError(format!(
            "number of referencing columns ({}) does not match number of referenced columns ({})",
            def.columns.len(),
            def.parent_columns.len()
        )));
    }

    let child = root
        .get_table(&request.table)
        .ok_or_else(|| Error::UnknownTable(request.table.clone()))?;
    let parent = root
        .get_table(&def.parent_table)
        .ok_or_else(|| Error::UnknownTable(def.parent_table.clone()))?;

    let child_tags = child.resolve_columns(&def.columns)?;
    ensure_distinct(child.name(), &def.columns, &child_tags)?;
    let parent_tags = parent.resolve_columns(&def.parent_columns)?;
    ensure_distinct(parent.name(), &def.parent_columns, &parent_tags)?;

    let parent_index = resolve_parent_index(parent, def.parent_index.as_deref(), &parent_tags)?
        .name()
        .to_string();

    let collection = root.foreign_key_collection();
    let name = match &def.name {
        Some(name) if name.is_empty() => {
            return Err(Error::InvalidArgumentError(
                "foreign key name is empty".into(),
            ));
        }
        Some(name) => {
            if collection.contains(name) {
                return Err(Error::DuplicateConstraintName(name.clone()));
            }
            name.clone()
        }
        None => {
            let seed = NameSeed {
                child_table: NameKey::new(child.name()),
                child_columns: &child_tags,
                parent_table: NameKey::new(parent.name()),
                parent_columns: &parent_tags,
            };
            generate_constraint_name(collection, &seed)?
        }
    };

    let (updated_child, child_index) = resolve_child_index(child, def.index.as_deref(), &child_tags)?;
    let synthesized_index = updated_child.as_ref().map(|_| child_index.clone());

    let constraint = ForeignKeyConstraint {
        name,
        child_table_id: child.id(),
        child_table: child.name().to_string(),
        child_index,
        child_columns: child_tags,
        parent_table_id: parent.id(),
        parent_table: parent.name().to_string(),
        parent_index,
        parent_columns: parent_tags,
        on_update: def.on_update,
        on_delete: def.on_delete,
    };

    tracing::debug!(
        constraint = %constraint.name,
        child = %constraint.child_table,
        child_index = %constraint.child_index,
        parent = %constraint.parent_table,
        parent_index = %constraint.parent_index,
        synthesized = synthesized_index.is_some(),
        "resolved foreign key"
    );

    let collection = collection.with_key(constraint.clone())?;
    let mut next = root.clone();
    if let Some(table) = updated_child {
        next = next.put_table(table);
    }
    let next = next.put_foreign_key_collection(collection);

    Ok(ResolvedForeignKey {
        root: next,
        constraint,
        synthesized_index,
    })
}

fn resolve_parent_index<'t>(
    parent: &'t Table,
    explicit: Option<&str>,
    tags: &[Tag],
) -> Result<&'t Index> {
    let indexes = parent.schema().indexes();
    let found = match explicit {
        Some(name) => indexes
            .get_by_name_case_insensitive(name)
            .filter(|idx| idx.matches_tags(tags)),
        None => indexes.get_by_tags(tags),
    };
    found.ok_or_else(|| Error::NoMatchingParentIndex {
        table: parent.name().to_string(),
        columns: parent.column_names(tags),
    })
}

/// Find or synthesize the child index.
///
/// Returns the updated child table when an index had to be created.
fn resolve_child_index(
    child: &Table,
    explicit: Option<&str>,
    tags: &[Tag],
) -> Result<(Option<Table>, String)> {
    let indexes = child.schema().indexes();
    match explicit {
        Some(name) => match indexes.get_by_name_case_insensitive(name) {
            Some(idx) if idx.matches_tags(tags) => Ok((None, idx.name().to_string())),
            Some(idx) => Err(Error::InvalidArgumentError(format!(
                "index '{}' on table '{}' does not cover the foreign key columns ({}) in order",
                idx.name(),
                child.name(),
                child.column_names(tags).join(", ")
            ))),
            None => {
                let table = child.with_index(name, tags.to_vec(), false)?;
                Ok((Some(table), name.to_string()))
            }
        },
        None => match indexes.get_by_tags(tags) {
            Some(idx) => Ok((None, idx.name().to_string())),
            None => {
                let name = indexes.unused_name_for_columns(&child.column_names(tags));
                let table = child.with_index(&name, tags.to_vec(), false)?;
                Ok((Some(table), name))
            }
        },
    }
}
