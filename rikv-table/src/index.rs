//! Per-table index catalog.
//!
//! An index is a named, ordered sequence of tags. Order matters: a composite
//! index `(v1, v2)` is a different index from `(v2, v1)` and neither satisfies a
//! lookup for `(v1)` alone. Foreign key resolution relies on exact tag-sequence
//! matches only.

#![forbid(unsafe_code)]

use bitcode::{Decode, Encode};
use rikv_result::{Error, Result};

use crate::names::names_equal;
use crate::types::Tag;

/// A named index over one table.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Index {
    name: String,
    tags: Vec<Tag>,
    unique: bool,
    primary_key: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, tags: Vec<Tag>, unique: bool) -> Self {
        Self {
            name: name.into(),
            tags,
            unique,
            primary_key: false,
        }
    }

    pub(crate) fn primary(name: impl Into<String>, tags: Vec<Tag>) -> Self {
        Self {
            name: name.into(),
            tags,
            unique: true,
            primary_key: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Indexed column tags, in index order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn covers_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Exact, ordered tag-sequence equality.
    pub fn matches_tags(&self, tags: &[Tag]) -> bool {
        self.tags == tags
    }
}

/// Ordered set of indexes belonging to one table.
///
/// Indexes keep their creation order, which is also the order lookups by tag
/// sequence scan in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct IndexCatalog {
    indexes: Vec<Index>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_indexes(indexes: Vec<Index>) -> Self {
        Self { indexes }
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.get_by_name_case_insensitive(name).is_some()
    }

    pub fn get_by_name_case_insensitive(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|idx| names_equal(&idx.name, name))
    }

    /// First index whose tag sequence equals `tags` exactly, in order.
    pub fn get_by_tags(&self, tags: &[Tag]) -> Option<&Index> {
        self.indexes.iter().find(|idx| idx.matches_tags(tags))
    }

    /// Index other than `name` with the same tag sequence as `name`.
    pub fn replacement_for(&self, name: &str) -> Option<&Index> {
        let target = self.get_by_name_case_insensitive(name)?;
        self.indexes
            .iter()
            .find(|idx| !names_equal(&idx.name, name) && idx.matches_tags(&target.tags))
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|idx| idx.primary_key)
    }

    /// Add a secondary index.
    ///
    /// `table` is used for error reporting only.
    pub fn add_index(
        &mut self,
        table: &str,
        name: &str,
        tags: Vec<Tag>,
        unique: bool,
    ) -> Result<&Index> {
        self.push(table, Index::new(name, tags, unique))
    }

    pub(crate) fn push(&mut self, table: &str, index: Index) -> Result<&Index> {
        if index.name.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "index on table '{table}' requires a name"
            )));
        }
        if index.tags.is_empty() {
            return Err(Error::InvalidArgumentError(format!(
                "index '{}' on table '{table}' requires at least one column",
                index.name
            )));
        }
        if self.contains_name(&index.name) {
            return Err(Error::DuplicateIndexName {
                table: table.to_string(),
                index: index.name,
            });
        }
        self.indexes.push(index);
        let last = self.indexes.len() - 1;
        Ok(&self.indexes[last])
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Index> {
        let pos = self
            .indexes
            .iter()
            .position(|idx| names_equal(&idx.name, name))?;
        Some(self.indexes.remove(pos))
    }

    pub(crate) fn rename(&mut self, table: &str, from: &str, to: &str) -> Result<()> {
        if !names_equal(from, to) && self.contains_name(to) {
            return Err(Error::DuplicateIndexName {
                table: table.to_string(),
                index: to.to_string(),
            });
        }
        let index = self
            .indexes
            .iter_mut()
            .find(|idx| names_equal(&idx.name, from))
            .ok_or_else(|| Error::UnknownIndex {
                table: table.to_string(),
                index: from.to_string(),
            })?;
        index.name = to.to_string();
        Ok(())
    }

    /// Drop every index covering `tag`, returning the dropped indexes.
    pub(crate) fn remove_covering(&mut self, tag: Tag) -> Vec<Index> {
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.indexes)
            .into_iter()
            .partition(|idx| idx.covers_tag(tag));
        self.indexes = kept;
        dropped
    }

    /// Derive an index name from column names that no existing index uses.
    ///
    /// A single column yields its own name; multiple columns are joined with
    /// `_`. Collisions are resolved by appending `_2`, `_3`, ...
    pub fn unused_name_for_columns(&self, column_names: &[String]) -> String {
        let base = column_names.join("_");
        if !self.contains_name(&base) {
            return base;
        }
        (2u64..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.contains_name(candidate))
            .unwrap_or(base)
    }
}
