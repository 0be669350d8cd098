//! Persisted form of the foreign key collection.
//!
//! A stored record carries tables by id only. Display names are looked up
//! again when the collection is decoded, so a rename between encode and
//! decode is picked up automatically.

#![forbid(unsafe_code)]

use bitcode::{Decode, Encode};
use rikv_result::{Error, Result};

use super::collection::ForeignKeyCollection;
use super::types::{ForeignKeyAction, ForeignKeyConstraint};
use crate::types::{TableId, Tag};

/// Fixed on-disk layout of one constraint.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub(crate) struct StoredForeignKey {
    pub name: String,
    pub child_table_id: TableId,
    pub child_index: String,
    pub child_columns: Vec<Tag>,
    pub parent_table_id: TableId,
    pub parent_index: String,
    pub parent_columns: Vec<Tag>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

impl From<&ForeignKeyConstraint> for StoredForeignKey {
    fn from(fk: &ForeignKeyConstraint) -> Self {
        Self {
            name: fk.name.clone(),
            child_table_id: fk.child_table_id,
            child_index: fk.child_index.clone(),
            child_columns: fk.child_columns.clone(),
            parent_table_id: fk.parent_table_id,
            parent_index: fk.parent_index.clone(),
            parent_columns: fk.parent_columns.clone(),
            on_update: fk.on_update,
            on_delete: fk.on_delete,
        }
    }
}

impl StoredForeignKey {
    fn hydrate<F>(self, table_name: &F) -> Result<ForeignKeyConstraint>
    where
        F: Fn(TableId) -> Option<String>,
    {
        let lookup = |id: TableId| {
            table_name(id).ok_or_else(|| {
                Error::CatalogError(format!(
                    "foreign key '{}' refers to unknown table id {id}",
                    self.name
                ))
            })
        };
        let child_table = lookup(self.child_table_id)?;
        let parent_table = lookup(self.parent_table_id)?;
        Ok(ForeignKeyConstraint {
            name: self.name,
            child_table_id: self.child_table_id,
            child_table,
            child_index: self.child_index,
            child_columns: self.child_columns,
            parent_table_id: self.parent_table_id,
            parent_table,
            parent_index: self.parent_index,
            parent_columns: self.parent_columns,
            on_update: self.on_update,
            on_delete: self.on_delete,
        })
    }
}

pub(crate) fn to_stored(collection: &ForeignKeyCollection) -> Vec<StoredForeignKey> {
    collection.iter().map(StoredForeignKey::from).collect()
}

pub(crate) fn from_stored<F>(records: Vec<StoredForeignKey>, table_name: F) -> Result<ForeignKeyCollection>
where
    F: Fn(TableId) -> Option<String>,
{
    let keys = records
        .into_iter()
        .map(|record| record.hydrate(&table_name))
        .collect::<Result<Vec<_>>>()?;
    ForeignKeyCollection::from_keys(keys)
        .map_err(|err| Error::catalog("stored foreign keys are inconsistent", err))
}

/// Serialize every constraint in name order.
pub fn encode_foreign_keys(collection: &ForeignKeyCollection) -> Vec<u8> {
    bitcode::encode(&to_stored(collection))
}

/// Decode a collection written by [`encode_foreign_keys`].
///
/// `table_name` maps a table id to its current display name.
pub fn decode_foreign_keys<F>(bytes: &[u8], table_name: F) -> Result<ForeignKeyCollection>
where
    F: Fn(TableId) -> Option<String>,
{
    let records: Vec<StoredForeignKey> = bitcode::decode(bytes)
        .map_err(|err| Error::catalog("failed to decode foreign key collection", err))?;
    from_stored(records, table_name)
}
