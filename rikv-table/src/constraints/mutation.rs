//! How schema changes carry the foreign key collection along.
//!
//! Each function takes a root and returns a new one in which the table change
//! and the matching collection change are applied together, or an error and no
//! change at all.

#![forbid(unsafe_code)]

use rikv_result::{Error, Result};

use super::collection::ForeignKeyCollection;
use super::types::ForeignKeyConstraint;
use crate::names::NameKey;
use crate::root::Root;
use crate::table::Table;

fn lookup_table<'r>(root: &'r Root, name: &str) -> Result<&'r Table> {
    root.get_table(name)
        .ok_or_else(|| Error::UnknownTable(name.to_string()))
}

fn drop_dependents(
    collection: &ForeignKeyCollection,
    dependents: &[&ForeignKeyConstraint],
    reason: &str,
) -> ForeignKeyCollection {
    for fk in dependents {
        tracing::debug!(constraint = %fk.name, reason, "cascading foreign key drop");
    }
    collection.without_keys(dependents.iter().map(|fk| fk.name.as_str()))
}

/// Drop a column. Constraints using its tag block the drop unless `cascade`.
pub(crate) fn drop_column(root: &Root, table_name: &str, column: &str, cascade: bool) -> Result<Root> {
    let table = lookup_table(root, table_name)?;
    let tag = table
        .schema()
        .column_by_name(column)
        .map(|col| col.tag)
        .ok_or_else(|| Error::UnknownColumn {
            table: table.name().to_string(),
            column: column.to_string(),
        })?;

    let collection = root.foreign_key_collection();
    let dependents = collection.using_tag(table.id(), tag);
    if let Some(first) = dependents.first()
        && !cascade
    {
        return Err(Error::ColumnUsedByForeignKey {
            table: table.name().to_string(),
            column: column.to_string(),
            constraint: first.name.clone(),
        });
    }

    let updated = table.without_column(column)?;
    let collection = drop_dependents(collection, &dependents, "column dropped");
    Ok(root
        .put_table(updated)
        .put_foreign_key_collection(collection))
}

/// Drop an index.
///
/// Constraints backed by it move to another index with the identical tag
/// sequence when one exists. Otherwise they block the drop unless `cascade`.
pub(crate) fn drop_index(root: &Root, table_name: &str, index: &str, cascade: bool) -> Result<Root> {
    let table = lookup_table(root, table_name)?;
    let updated = table.without_index(index)?;
    let collection = root.foreign_key_collection();
    let dependents = collection.using_index(table.id(), index);
    if dependents.is_empty() {
        return Ok(root.put_table(updated));
    }

    let collection = match table.schema().indexes().replacement_for(index) {
        Some(replacement) => {
            collection.with_repointed_index(table.id(), index, replacement.name())
        }
        None if cascade => drop_dependents(collection, &dependents, "index dropped"),
        None => {
            return Err(Error::IndexUsedByForeignKey {
                table: table.name().to_string(),
                index: index.to_string(),
                constraint: dependents[0].name.clone(),
            });
        }
    };
    Ok(root
        .put_table(updated)
        .put_foreign_key_collection(collection))
}

pub(crate) fn rename_index(root: &Root, table_name: &str, from: &str, to: &str) -> Result<Root> {
    let table = lookup_table(root, table_name)?;
    let updated = table.with_renamed_index(from, to)?;
    let collection = root
        .foreign_key_collection()
        .with_repointed_index(table.id(), from, to);
    Ok(root
        .put_table(updated)
        .put_foreign_key_collection(collection))
}

/// Rename a table and refresh the display names stored on its constraints.
pub(crate) fn rename_table(root: &Root, from: &str, to: &str) -> Result<Root> {
    let table = lookup_table(root, from)?;
    if to.is_empty() {
        return Err(Error::InvalidArgumentError("table name is empty".into()));
    }
    if NameKey::new(from) != NameKey::new(to) && root.get_table(to).is_some() {
        return Err(Error::DuplicateTableName(to.to_string()));
    }
    let collection = root
        .foreign_key_collection()
        .with_renamed_table(table.id(), to);
    Ok(root
        .put_table(table.with_name(to))
        .put_foreign_key_collection(collection))
}

/// Drop a table together with the constraints it declares.
///
/// Constraints on other tables that reference it block the drop unless
/// `cascade`, in which case they are dropped too.
pub(crate) fn drop_table(root: &Root, table_name: &str, cascade: bool) -> Result<Root> {
    let table = lookup_table(root, table_name)?;
    let collection = root.foreign_key_collection();
    let id = table.id();

    if !cascade
        && let Some(fk) = collection
            .referencing(id)
            .into_iter()
            .find(|fk| fk.child_table_id != id)
    {
        return Err(Error::TableReferencedByForeignKey {
            table: table.name().to_string(),
            constraint: fk.name.clone(),
        });
    }

    let dependents: Vec<&ForeignKeyConstraint> =
        collection.iter().filter(|fk| fk.involves_table(id)).collect();
    let collection = drop_dependents(collection, &dependents, "table dropped");
    Ok(root
        .remove_table(table_name)
        .put_foreign_key_collection(collection))
}
