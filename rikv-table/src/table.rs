//! Immutable table values.
//!
//! A [`Table`] pairs an identifier and display name with its [`Schema`]. All
//! mutators borrow the current table and return a new one, leaving the
//! original untouched for any root still holding it.

#![forbid(unsafe_code)]

use bitcode::{Decode, Encode};
use rikv_result::{Error, Result};
use rikv_types::reserved::PRIMARY_KEY_INDEX_NAME;
use rustc_hash::FxHashSet;

use crate::index::Index;
use crate::names::{NameKey, names_equal};
use crate::schema::{Column, ColumnDef, Schema};
use crate::types::{TableId, Tag};

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Table {
    id: TableId,
    name: String,
    schema: Schema,
}

impl Table {
    /// Build a table from column definitions and primary key column names.
    ///
    /// Explicit tags are reserved first so automatically issued tags never
    /// collide with them. A non-empty primary key gets an implicit unique
    /// index named [`PRIMARY_KEY_INDEX_NAME`].
    pub fn create(
        id: TableId,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[String],
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgumentError("table name is empty".into()));
        }
        if columns.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "table '{name}' requires at least one column"
            )));
        }

        let mut seen = FxHashSet::default();
        for def in columns {
            if def.name.is_empty() {
                return Err(Error::InvalidArgumentError(format!(
                    "column name in table '{name}' is empty"
                )));
            }
            if !seen.insert(NameKey::new(&def.name)) {
                return Err(Error::DuplicateColumnName {
                    table: name.to_string(),
                    column: def.name.clone(),
                });
            }
        }

        let mut schema = Schema::default();
        for def in columns {
            if let Some(tag) = def.tag
                && !schema.tags_mut().reserve(tag)
            {
                return Err(Error::DuplicateTag {
                    table: name.to_string(),
                    tag,
                });
            }
        }
        for def in columns {
            let tag = match def.tag {
                Some(tag) => tag,
                None => schema.tags_mut().next_tag(),
            };
            schema.columns_mut().push(Column {
                tag,
                name: def.name.clone(),
            });
        }

        let mut table = Self {
            id,
            name: name.to_string(),
            schema,
        };

        if !primary_key.is_empty() {
            let pk_tags = table.resolve_columns(primary_key)?;
            ensure_distinct(name, primary_key, &pk_tags)?;
            table
                .schema
                .indexes_mut()
                .push(name, Index::primary(PRIMARY_KEY_INDEX_NAME, pk_tags.clone()))?;
            table.schema.set_primary_key(pk_tags);
        }

        Ok(table)
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Translate column names to tags using the current schema.
    pub fn resolve_columns(&self, names: &[String]) -> Result<Vec<Tag>> {
        names
            .iter()
            .map(|name| {
                self.schema
                    .column_by_name(name)
                    .map(|col| col.tag)
                    .ok_or_else(|| Error::UnknownColumn {
                        table: self.name.clone(),
                        column: name.clone(),
                    })
            })
            .collect()
    }

    pub fn column_names(&self, tags: &[Tag]) -> Vec<String> {
        self.schema.column_names(tags)
    }

    /// Append a column, returning the new table and the column's tag.
    pub fn with_column(&self, def: &ColumnDef) -> Result<(Self, Tag)> {
        if def.name.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "column name in table '{}' is empty",
                self.name
            )));
        }
        if self.schema.column_by_name(&def.name).is_some() {
            return Err(Error::DuplicateColumnName {
                table: self.name.clone(),
                column: def.name.clone(),
            });
        }

        let mut next = self.clone();
        let tag = match def.tag {
            Some(tag) => {
                if !next.schema.tags_mut().reserve(tag) {
                    return Err(Error::DuplicateTag {
                        table: self.name.clone(),
                        tag,
                    });
                }
                tag
            }
            None => next.schema.tags_mut().next_tag(),
        };
        next.schema.columns_mut().push(Column {
            tag,
            name: def.name.clone(),
        });
        Ok((next, tag))
    }

    /// Remove a column along with every index covering it.
    ///
    /// The column's tag stays issued. Primary key columns cannot be dropped.
    pub fn without_column(&self, name: &str) -> Result<Self> {
        let column = self
            .schema
            .column_by_name(name)
            .ok_or_else(|| Error::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })?
            .clone();
        if self.schema.primary_key().contains(&column.tag) {
            return Err(Error::InvalidArgumentError(format!(
                "cannot drop primary key column '{}' of table '{}'",
                column.name, self.name
            )));
        }
        if self.schema.columns().len() == 1 {
            return Err(Error::InvalidArgumentError(format!(
                "cannot drop the only column of table '{}'",
                self.name
            )));
        }

        let mut next = self.clone();
        next.schema.columns_mut().retain(|col| col.tag != column.tag);
        for index in next.schema.indexes_mut().remove_covering(column.tag) {
            tracing::debug!(
                table = %self.name,
                index = index.name(),
                column = %column.name,
                "dropping index covering dropped column"
            );
        }
        Ok(next)
    }

    pub fn with_renamed_column(&self, from: &str, to: &str) -> Result<Self> {
        if to.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "column name in table '{}' is empty",
                self.name
            )));
        }
        if !names_equal(from, to) && self.schema.column_by_name(to).is_some() {
            return Err(Error::DuplicateColumnName {
                table: self.name.clone(),
                column: to.to_string(),
            });
        }
        let mut next = self.clone();
        let column = next
            .schema
            .columns_mut()
            .iter_mut()
            .find(|col| names_equal(&col.name, from))
            .ok_or_else(|| Error::UnknownColumn {
                table: self.name.clone(),
                column: from.to_string(),
            })?;
        column.name = to.to_string();
        Ok(next)
    }

    /// Add a secondary index over `tags`, which must all be live columns.
    pub fn with_index(&self, name: &str, tags: Vec<Tag>, unique: bool) -> Result<Self> {
        if let Some(&tag) = tags.iter().find(|&&tag| !self.schema.has_tag(tag)) {
            return Err(Error::UnknownColumn {
                table: self.name.clone(),
                column: format!("#{tag}"),
            });
        }
        let mut next = self.clone();
        next.schema
            .indexes_mut()
            .add_index(&self.name, name, tags, unique)?;
        Ok(next)
    }

    pub fn without_index(&self, name: &str) -> Result<Self> {
        let index = self
            .schema
            .indexes()
            .get_by_name_case_insensitive(name)
            .ok_or_else(|| Error::UnknownIndex {
                table: self.name.clone(),
                index: name.to_string(),
            })?;
        if index.is_primary_key() {
            return Err(Error::InvalidArgumentError(format!(
                "cannot drop the primary key index of table '{}'",
                self.name
            )));
        }
        let mut next = self.clone();
        next.schema.indexes_mut().remove(name);
        Ok(next)
    }

    pub fn with_renamed_index(&self, from: &str, to: &str) -> Result<Self> {
        if to.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "index name on table '{}' is empty",
                self.name
            )));
        }
        let mut next = self.clone();
        next.schema.indexes_mut().rename(&self.name, from, to)?;
        Ok(next)
    }

    pub fn with_name(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub(crate) fn with_schema(&self, schema: Schema) -> Self {
        Self {
            schema,
            ..self.clone()
        }
    }

    pub(crate) fn with_id(&self, id: TableId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

/// Reject column lists naming the same column twice.
pub(crate) fn ensure_distinct(table: &str, names: &[String], tags: &[Tag]) -> Result<()> {
    let mut seen = FxHashSet::default();
    for (name, tag) in names.iter().zip(tags) {
        if !seen.insert(*tag) {
            return Err(Error::InvalidArgumentError(format!(
                "duplicate column '{name}' in column list for table '{table}'"
            )));
        }
    }
    Ok(())
}
