//! The per-root set of foreign keys.
//!
//! [`ForeignKeyCollection`] is a persistent ordered map keyed by the
//! case-folded constraint name. Every "mutator" returns a new collection that
//! shares structure with the old one, so a root holding the old collection
//! keeps observing exactly what it held before.

#![forbid(unsafe_code)]

use im::OrdMap;
use rikv_result::{Error, Result};

use super::types::ForeignKeyConstraint;
use crate::names::NameKey;
use crate::types::{TableId, Tag};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForeignKeyCollection {
    keys: OrdMap<NameKey, ForeignKeyConstraint>,
}

impl ForeignKeyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting case-insensitive duplicate names.
    pub fn from_keys<I>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = ForeignKeyConstraint>,
    {
        keys.into_iter()
            .try_fold(Self::new(), |acc, fk| acc.with_key(fk))
    }

    pub(crate) fn from_map(keys: OrdMap<NameKey, ForeignKeyConstraint>) -> Self {
        Self { keys }
    }

    pub(crate) fn as_map(&self) -> &OrdMap<NameKey, ForeignKeyConstraint> {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ForeignKeyConstraint> {
        self.keys.get(&NameKey::new(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains_key(&NameKey::new(name))
    }

    /// Constraints ordered by case-folded name.
    pub fn iter(&self) -> impl Iterator<Item = &ForeignKeyConstraint> {
        self.keys.values()
    }

    /// Every constraint, ordered by case-folded name.
    pub fn all_keys(&self) -> Vec<ForeignKeyConstraint> {
        self.iter().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|fk| fk.name.clone()).collect()
    }

    /// Insert a new constraint.
    pub fn with_key(&self, fk: ForeignKeyConstraint) -> Result<Self> {
        if fk.name.is_empty() {
            return Err(Error::InvalidArgumentError(
                "foreign key name is empty".into(),
            ));
        }
        let key = fk.key();
        if let Some(existing) = self.keys.get(&key) {
            return Err(Error::DuplicateConstraintName(existing.name.clone()));
        }
        Ok(Self {
            keys: self.keys.update(key, fk),
        })
    }

    /// Insert or replace the constraint with `fk`'s name.
    pub(crate) fn with_replaced(&self, fk: ForeignKeyConstraint) -> Self {
        Self {
            keys: self.keys.update(fk.key(), fk),
        }
    }

    pub fn without_key(&self, name: &str) -> Result<Self> {
        let key = NameKey::new(name);
        if !self.keys.contains_key(&key) {
            return Err(Error::UnknownForeignKey(name.to_string()));
        }
        Ok(Self {
            keys: self.keys.without(&key),
        })
    }

    /// Remove every named constraint that exists; unknown names are ignored.
    pub(crate) fn without_keys<'a, I>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut keys = self.keys.clone();
        for name in names {
            keys.remove(&NameKey::new(name));
        }
        Self { keys }
    }

    /// Constraints whose referencing (child) side is `table_id`.
    pub fn declared_on(&self, table_id: TableId) -> Vec<&ForeignKeyConstraint> {
        self.iter()
            .filter(|fk| fk.child_table_id == table_id)
            .collect()
    }

    /// Constraints whose referenced (parent) side is `table_id`.
    pub fn referencing(&self, table_id: TableId) -> Vec<&ForeignKeyConstraint> {
        self.iter()
            .filter(|fk| fk.parent_table_id == table_id)
            .collect()
    }

    pub fn using_tag(&self, table_id: TableId, tag: Tag) -> Vec<&ForeignKeyConstraint> {
        self.iter().filter(|fk| fk.uses_tag(table_id, tag)).collect()
    }

    pub fn using_index(&self, table_id: TableId, index: &str) -> Vec<&ForeignKeyConstraint> {
        self.iter()
            .filter(|fk| fk.uses_index(table_id, index))
            .collect()
    }

    /// Refresh denormalized table names after a rename.
    pub(crate) fn with_renamed_table(&self, table_id: TableId, name: &str) -> Self {
        let mut next = self.clone();
        for fk in self.iter().filter(|fk| fk.involves_table(table_id)) {
            let mut renamed = fk.clone();
            renamed.rename_table(table_id, name);
            next = next.with_replaced(renamed);
        }
        next
    }

    /// Re-point constraints backed by index `from` on `table_id` to `to`.
    pub(crate) fn with_repointed_index(&self, table_id: TableId, from: &str, to: &str) -> Self {
        let mut next = self.clone();
        for fk in self.using_index(table_id, from) {
            let mut repointed = fk.clone();
            repointed.repoint_index(table_id, from, to);
            tracing::debug!(
                constraint = %fk.name,
                from,
                to,
                "re-pointing foreign key to replacement index"
            );
            next = next.with_replaced(repointed);
        }
        next
    }

    /// Rewrite table ids through `map`, leaving unmapped ids untouched.
    pub(crate) fn with_remapped_tables<F>(&self, mut map: F) -> Self
    where
        F: FnMut(TableId) -> Option<TableId>,
    {
        let mut next = self.clone();
        for fk in self.iter() {
            let child = map(fk.child_table_id);
            let parent = map(fk.parent_table_id);
            if child.is_none() && parent.is_none() {
                continue;
            }
            let mut remapped = fk.clone();
            if let Some(id) = child {
                remapped.child_table_id = id;
            }
            if let Some(id) = parent {
                remapped.parent_table_id = id;
            }
            next = next.with_replaced(remapped);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ForeignKeyAction;

    fn fk(name: &str, child_tag: Tag, parent_tag: Tag) -> ForeignKeyConstraint {
        ForeignKeyConstraint {
            name: name.to_string(),
            child_table_id: 2,
            child_table: "child".into(),
            child_index: format!("c{child_tag}"),
            child_columns: vec![child_tag],
            parent_table_id: 1,
            parent_table: "parent".into(),
            parent_index: format!("p{parent_tag}"),
            parent_columns: vec![parent_tag],
            on_update: ForeignKeyAction::Default,
            on_delete: ForeignKeyAction::Default,
        }
    }

    #[test]
    fn names_are_unique_case_insensitively() {
        let coll = ForeignKeyCollection::new().with_key(fk("Fk1", 11, 1)).unwrap();
        let err = coll.with_key(fk("FK1", 12, 2)).unwrap_err();
        assert_eq!(err, Error::DuplicateConstraintName("Fk1".into()));
        assert_eq!(coll.get("fk1").unwrap().name, "Fk1");
    }

    #[test]
    fn all_keys_are_sorted_by_name() {
        let coll = ForeignKeyCollection::from_keys([fk("b", 12, 2), fk("A", 11, 1), fk("c", 10, 0)])
            .unwrap();
        assert_eq!(coll.names(), vec!["A", "b", "c"]);
    }

    #[test]
    fn mutation_leaves_previous_collection_intact() {
        let before = ForeignKeyCollection::from_keys([fk("fk1", 11, 1)]).unwrap();
        let after = before.with_key(fk("fk2", 12, 2)).unwrap();
        let removed = after.without_key("FK1").unwrap();
        assert_eq!(before.names(), vec!["fk1"]);
        assert_eq!(after.names(), vec!["fk1", "fk2"]);
        assert_eq!(removed.names(), vec!["fk2"]);
        assert!(matches!(
            removed.without_key("fk1"),
            Err(Error::UnknownForeignKey(_))
        ));
    }

    #[test]
    fn queries_filter_by_side() {
        let coll = ForeignKeyCollection::from_keys([fk("fk1", 11, 1), fk("fk2", 12, 2)]).unwrap();
        assert_eq!(coll.declared_on(2).len(), 2);
        assert_eq!(coll.referencing(1).len(), 2);
        assert_eq!(coll.using_tag(2, 12)[0].name, "fk2");
        assert_eq!(coll.using_tag(1, 1)[0].name, "fk1");
        assert!(coll.using_tag(1, 11).is_empty());
        assert_eq!(coll.using_index(1, "P2")[0].name, "fk2");
    }

    #[test]
    fn rename_refreshes_display_names() {
        let coll = ForeignKeyCollection::from_keys([fk("fk1", 11, 1)]).unwrap();
        let renamed = coll.with_renamed_table(1, "mother");
        assert_eq!(renamed.get("fk1").unwrap().parent_table, "mother");
        assert_eq!(renamed.get("fk1").unwrap().child_table, "child");
        assert_eq!(coll.get("fk1").unwrap().parent_table, "parent");
    }
}
