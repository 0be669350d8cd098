//! Column definitions and table schemas.

#![forbid(unsafe_code)]

use bitcode::{Decode, Encode};

use crate::index::IndexCatalog;
use crate::names::names_equal;
use crate::tags::TagSpace;
use crate::types::Tag;

/// A column in a table's current schema.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Column {
    pub tag: Tag,
    pub name: String,
}

/// Column definition supplied by DDL.
///
/// An explicit tag pins the column's identity (used when replaying schemas
/// from another store); otherwise the table's tag space issues one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub tag: Option<Tag>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }
}

impl From<&str> for ColumnDef {
    fn from(value: &str) -> Self {
        ColumnDef::new(value)
    }
}

/// Columns, primary key, index catalog and tag space of one table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct Schema {
    columns: Vec<Column>,
    primary_key: Vec<Tag>,
    indexes: IndexCatalog,
    tags: TagSpace,
}

impl Schema {
    /// Columns in declaration order as `(name, tag)` pairs.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| names_equal(&col.name, name))
    }

    pub fn column_by_tag(&self, tag: Tag) -> Option<&Column> {
        self.columns.iter().find(|col| col.tag == tag)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.column_by_tag(tag).is_some()
    }

    /// Primary key column tags, in key order. Empty when the table has none.
    pub fn primary_key(&self) -> &[Tag] {
        &self.primary_key
    }

    pub fn indexes(&self) -> &IndexCatalog {
        &self.indexes
    }

    pub fn tag_space(&self) -> &TagSpace {
        &self.tags
    }

    /// Display names for `tags`; tags with no live column render as `#<tag>`.
    pub fn column_names(&self, tags: &[Tag]) -> Vec<String> {
        tags.iter()
            .map(|&tag| match self.column_by_tag(tag) {
                Some(col) => col.name.clone(),
                None => format!("#{tag}"),
            })
            .collect()
    }

    pub(crate) fn from_parts(
        columns: Vec<Column>,
        primary_key: Vec<Tag>,
        indexes: IndexCatalog,
        tags: TagSpace,
    ) -> Self {
        Self {
            columns,
            primary_key,
            indexes,
            tags,
        }
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.columns
    }

    pub(crate) fn set_primary_key(&mut self, tags: Vec<Tag>) {
        self.primary_key = tags;
    }

    pub(crate) fn indexes_mut(&mut self) -> &mut IndexCatalog {
        &mut self.indexes
    }

    pub(crate) fn tags_mut(&mut self) -> &mut TagSpace {
        &mut self.tags
    }
}
