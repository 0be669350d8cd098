//! Immutable snapshot roots.
//!
//! A [`Root`] holds every table and the foreign key collection at one point
//! in history. Both live in persistent maps, so deriving a new root from an
//! old one costs O(changes) and the old root stays valid.

#![forbid(unsafe_code)]

use std::sync::Arc;

use bitcode::{Decode, Encode};
use im::OrdMap;
use rikv_result::{Error, Result};
use rikv_types::reserved::{FIRST_USER_TABLE_ID, is_reserved_table_id};
use rustc_hash::FxHashMap;

use crate::constraints::codec::{StoredForeignKey, from_stored, to_stored};
use crate::constraints::{ForeignKeyCollection, IntegrityViolation, validate_collection};
use crate::names::NameKey;
use crate::table::Table;
use crate::types::TableId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Root {
    tables: OrdMap<NameKey, Arc<Table>>,
    foreign_keys: ForeignKeyCollection,
    next_table_id: TableId,
}

impl Default for Root {
    fn default() -> Self {
        Self {
            tables: OrdMap::new(),
            foreign_keys: ForeignKeyCollection::new(),
            next_table_id: FIRST_USER_TABLE_ID,
        }
    }
}

/// Persisted layout of a root.
#[derive(Encode, Decode)]
struct StoredRoot {
    next_table_id: TableId,
    tables: Vec<Table>,
    foreign_keys: Vec<StoredForeignKey>,
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        tables: OrdMap<NameKey, Arc<Table>>,
        foreign_keys: ForeignKeyCollection,
        next_table_id: TableId,
    ) -> Self {
        Self {
            tables,
            foreign_keys,
            next_table_id,
        }
    }

    pub(crate) fn table_map(&self) -> &OrdMap<NameKey, Arc<Table>> {
        &self.tables
    }

    pub(crate) fn next_table_id(&self) -> TableId {
        self.next_table_id
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&NameKey::new(name)).map(Arc::as_ref)
    }

    pub fn table_by_id(&self, id: TableId) -> Option<&Table> {
        self.tables
            .values()
            .find(|table| table.id() == id)
            .map(Arc::as_ref)
    }

    /// Tables ordered by case-folded name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values().map(Arc::as_ref)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables().map(|table| table.name().to_string()).collect()
    }

    /// Store `table` under its own name.
    ///
    /// An entry holding the same table id under another name is removed, so
    /// renaming a table is a single `put_table`.
    pub fn put_table(&self, table: Table) -> Root {
        let key = NameKey::new(table.name());
        let mut tables = self.tables.clone();
        let stale: Vec<NameKey> = tables
            .iter()
            .filter(|(k, t)| t.id() == table.id() && **k != key)
            .map(|(k, _)| k.clone())
            .collect();
        for k in stale {
            tables.remove(&k);
        }
        let next_table_id = self.next_table_id.max(table.id().saturating_add(1));
        tables.insert(key, Arc::new(table));
        Root {
            tables,
            foreign_keys: self.foreign_keys.clone(),
            next_table_id,
        }
    }

    pub(crate) fn remove_table(&self, name: &str) -> Root {
        Root {
            tables: self.tables.without(&NameKey::new(name)),
            ..self.clone()
        }
    }

    pub fn foreign_key_collection(&self) -> &ForeignKeyCollection {
        &self.foreign_keys
    }

    pub fn put_foreign_key_collection(&self, foreign_keys: ForeignKeyCollection) -> Root {
        Root {
            foreign_keys,
            ..self.clone()
        }
    }

    /// Next unused table id.
    pub(crate) fn allocate_table_id(&self) -> Result<TableId> {
        if self.next_table_id == TableId::MAX {
            return Err(Error::Internal("table id space exhausted".into()));
        }
        Ok(self.next_table_id)
    }

    pub fn validate_foreign_keys(&self) -> Vec<IntegrityViolation> {
        validate_collection(&self.foreign_keys, self)
    }

    pub fn encode(&self) -> Vec<u8> {
        let stored = StoredRoot {
            next_table_id: self.next_table_id,
            tables: self.tables().cloned().collect(),
            foreign_keys: to_stored(&self.foreign_keys),
        };
        bitcode::encode(&stored)
    }

    pub fn decode(bytes: &[u8]) -> Result<Root> {
        let stored: StoredRoot = bitcode::decode(bytes)
            .map_err(|err| Error::catalog("failed to decode root", err))?;

        let mut tables = OrdMap::new();
        let mut names: FxHashMap<TableId, String> = FxHashMap::default();
        for table in stored.tables {
            if is_reserved_table_id(table.id()) || table.id() >= stored.next_table_id {
                return Err(Error::CatalogError(format!(
                    "table '{}' has out-of-range id {}",
                    table.name(),
                    table.id()
                )));
            }
            if names.insert(table.id(), table.name().to_string()).is_some() {
                return Err(Error::CatalogError(format!(
                    "table id {} is used twice",
                    table.id()
                )));
            }
            let key = NameKey::new(table.name());
            if tables.insert(key, Arc::new(table)).is_some() {
                return Err(Error::CatalogError("table name is used twice".into()));
            }
        }

        let foreign_keys = from_stored(stored.foreign_keys, |id| names.get(&id).cloned())?;
        Ok(Root {
            tables,
            foreign_keys,
            next_table_id: stored.next_table_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    fn table(id: TableId, name: &str) -> Table {
        Table::create(id, name, &[ColumnDef::new("id")], &["id".to_string()]).unwrap()
    }

    #[test]
    fn put_table_leaves_previous_root_untouched() {
        let empty = Root::new();
        let one = empty.put_table(table(1, "t"));
        assert!(empty.get_table("t").is_none());
        assert_eq!(one.get_table("T").unwrap().id(), 1);
        assert_eq!(one.allocate_table_id().unwrap(), 2);
    }

    #[test]
    fn putting_a_renamed_table_replaces_the_old_entry() {
        let root = Root::new().put_table(table(1, "a"));
        let renamed = root.put_table(root.get_table("a").unwrap().with_name("b"));
        assert_eq!(renamed.table_names(), vec!["b"]);
        assert_eq!(renamed.table_by_id(1).unwrap().name(), "b");
    }

    #[test]
    fn encoded_root_decodes_to_equal_root() {
        let root = Root::new().put_table(table(1, "a")).put_table(table(2, "b"));
        let decoded = Root::decode(&root.encode()).unwrap();
        assert_eq!(decoded, root);
        assert!(matches!(
            Root::decode(b"definitely not a root"),
            Err(Error::CatalogError(msg)) if msg.starts_with("failed to decode root: ")
        ));
    }
}
