//! Three-way merge of diverged roots.
//!
//! [`merge_named`] is the primitive: it merges three maps of named schema
//! objects keyed by case-folded name, comparing whole definitions. Indexes and
//! foreign keys go through it; foreign keys are compared without their display
//! table names, which follow the tables. Tables are matched by id, so a
//! rename is an ordinary modification. A table changed on both sides is merged
//! again structurally (name, columns by tag, indexes by name) and only
//! conflicts if that finer merge does. [`merge_roots`] merges tables first,
//! then foreign keys, then validates every surviving constraint against the
//! merged tables.
//!
//! Per key, with `a`, `o` and `t` the ancestor, ours and theirs versions:
//!
//! | condition | result |
//! |---|---|
//! | `o == t` | `o` (covers "unchanged", "same change" and "deleted in both") |
//! | `o == a` | `t` |
//! | `t == a` | `o` |
//! | otherwise | conflict, `o` kept |

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use im::OrdMap;
use rikv_result::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::constraints::{
    ForeignKeyCollection, ForeignKeyConstraint, ForeignKeyDefinition, IntegrityViolation,
    validate_collection,
};
use crate::index::{Index, IndexCatalog};
use crate::names::NameKey;
use crate::root::Root;
use crate::schema::{Column, Schema};
use crate::table::Table;
use crate::types::{TableId, Tag};

/// A schema object identified by a case-insensitive name and compared by its
/// full definition.
pub trait NamedSchemaObject: Clone + PartialEq {
    fn object_name(&self) -> &str;

    fn name_key(&self) -> NameKey {
        NameKey::new(self.object_name())
    }
}

impl NamedSchemaObject for ForeignKeyConstraint {
    fn object_name(&self) -> &str {
        &self.name
    }
}

impl NamedSchemaObject for Table {
    fn object_name(&self) -> &str {
        self.name()
    }
}

impl NamedSchemaObject for Index {
    fn object_name(&self) -> &str {
        self.name()
    }
}

impl<T: NamedSchemaObject> NamedSchemaObject for Arc<T> {
    fn object_name(&self) -> &str {
        T::object_name(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MergeSide {
    Ancestor,
    Ours,
    Theirs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Added on both sides with different definitions.
    AddAdd,
    /// Changed differently on both sides.
    ModifyModify,
    /// Deleted on our side, changed on theirs.
    DeleteModify,
    /// Changed on our side, deleted on theirs.
    ModifyDelete,
    /// Added on their side under a new name with the same definition as an
    /// object added on ours.
    DuplicateDefinition,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::AddAdd => "added differently on both sides",
            ConflictKind::ModifyModify => "modified differently on both sides",
            ConflictKind::DeleteModify => "deleted on our side, modified on theirs",
            ConflictKind::ModifyDelete => "modified on our side, deleted on theirs",
            ConflictKind::DuplicateDefinition => "duplicates a definition added on our side",
        })
    }
}

/// One object the merge could not reconcile, with every version seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConflict<T> {
    pub name: String,
    pub kind: ConflictKind,
    pub ancestor: Option<T>,
    pub ours: Option<T>,
    pub theirs: Option<T>,
}

impl<T> MergeConflict<T> {
    pub fn version(&self, side: MergeSide) -> Option<&T> {
        match side {
            MergeSide::Ancestor => self.ancestor.as_ref(),
            MergeSide::Ours => self.ours.as_ref(),
            MergeSide::Theirs => self.theirs.as_ref(),
        }
    }
}

/// Result of [`merge_named`].
#[derive(Clone, Debug)]
pub struct NamedMerge<T: Clone> {
    pub merged: OrdMap<NameKey, T>,
    pub conflicts: Vec<MergeConflict<T>>,
}

/// Merge three name-keyed maps. Conflicts are listed in key order.
pub fn merge_named<T: NamedSchemaObject>(
    ancestor: &OrdMap<NameKey, T>,
    ours: &OrdMap<NameKey, T>,
    theirs: &OrdMap<NameKey, T>,
) -> NamedMerge<T> {
    let (merged, conflicts) = merge_keyed(
        ancestor,
        ours,
        theirs,
        |obj| obj.object_name().to_string(),
        |x, y| x == y,
    );
    NamedMerge { merged, conflicts }
}

/// `same` decides whether two versions of one entry are unchanged relative to
/// each other.
fn merge_keyed<K, T>(
    ancestor: &OrdMap<K, T>,
    ours: &OrdMap<K, T>,
    theirs: &OrdMap<K, T>,
    name_of: impl Fn(&T) -> String,
    same: impl Fn(&T, &T) -> bool,
) -> (OrdMap<K, T>, Vec<MergeConflict<T>>)
where
    K: Ord + Clone,
    T: Clone,
{
    let unchanged = |x: Option<&T>, y: Option<&T>| match (x, y) {
        (Some(x), Some(y)) => same(x, y),
        (x, y) => x.is_none() && y.is_none(),
    };
    let mut keys: Vec<&K> = ancestor
        .keys()
        .chain(ours.keys())
        .chain(theirs.keys())
        .collect();
    keys.sort();
    keys.dedup();

    let mut merged = ours.clone();
    let mut conflicts = Vec::new();
    for key in keys {
        let a = ancestor.get(key);
        let o = ours.get(key);
        let t = theirs.get(key);

        if unchanged(o, t) || unchanged(t, a) {
            continue;
        }
        if unchanged(o, a) {
            merged = match t {
                Some(value) => merged.update(key.clone(), value.clone()),
                None => merged.without(key),
            };
            continue;
        }

        let kind = match (a, o, t) {
            (None, _, _) => ConflictKind::AddAdd,
            (Some(_), None, _) => ConflictKind::DeleteModify,
            (Some(_), _, None) => ConflictKind::ModifyDelete,
            (Some(_), Some(_), Some(_)) => ConflictKind::ModifyModify,
        };
        // The key came from one of the three maps.
        let name = o.or(t).or(a).map(&name_of).unwrap_or_default();
        conflicts.push(MergeConflict {
            name,
            kind,
            ancestor: a.cloned(),
            ours: o.cloned(),
            theirs: t.cloned(),
        });
    }

    (merged, conflicts)
}

fn pick<T: PartialEq + Clone>(ancestor: &T, ours: &T, theirs: &T) -> Option<T> {
    if ours == theirs || theirs == ancestor {
        Some(ours.clone())
    } else if ours == ancestor {
        Some(theirs.clone())
    } else {
        None
    }
}

/// Keep `ours` order for surviving entries, then append entries only `theirs`
/// contributed in their order.
fn ordered<K: Ord + Clone, T: Clone>(
    merged: &OrdMap<K, T>,
    ours: impl IntoIterator<Item = K>,
    theirs: impl IntoIterator<Item = K>,
) -> Vec<T> {
    let mut seen = BTreeSet::new();
    ours.into_iter()
        .chain(theirs)
        .filter_map(|key| {
            let value = merged.get(&key)?;
            seen.insert(key).then(|| value.clone())
        })
        .collect()
}

/// Structural merge of one table changed on both sides.
///
/// Returns `None` when any part of the table conflicts or when the combined
/// result is not a valid schema, in which case the whole table stays a
/// conflict.
fn merge_table(ancestor: &Table, ours: &Table, theirs: &Table) -> Option<Table> {
    if ancestor.id() != ours.id() || ours.id() != theirs.id() {
        return None;
    }
    let name = pick(&ancestor.name(), &ours.name(), &theirs.name())?;
    let primary_key = pick(
        &ancestor.schema().primary_key(),
        &ours.schema().primary_key(),
        &theirs.schema().primary_key(),
    )?
    .to_vec();

    let columns_of = |table: &Table| -> OrdMap<Tag, Column> {
        table
            .schema()
            .columns()
            .iter()
            .map(|col| (col.tag, col.clone()))
            .collect()
    };
    let (columns, conflicts) = merge_keyed(
        &columns_of(ancestor),
        &columns_of(ours),
        &columns_of(theirs),
        |col| col.name.clone(),
        |x, y| x == y,
    );
    if !conflicts.is_empty() {
        return None;
    }
    let tags_of = |table: &Table| {
        table
            .schema()
            .columns()
            .iter()
            .map(|col| col.tag)
            .collect::<Vec<_>>()
    };
    let columns: Vec<Column> = ordered(&columns, tags_of(ours), tags_of(theirs));
    let mut names = FxHashSet::default();
    if !columns.iter().all(|col| names.insert(NameKey::new(&col.name))) {
        return None;
    }
    let live = |tag: &Tag| columns.iter().any(|col| col.tag == *tag);

    let indexes_of = |table: &Table| -> OrdMap<NameKey, Index> {
        table
            .schema()
            .indexes()
            .iter()
            .map(|index| (index.name_key(), index.clone()))
            .collect()
    };
    let NamedMerge {
        merged: indexes,
        conflicts,
    } = merge_named(&indexes_of(ancestor), &indexes_of(ours), &indexes_of(theirs));
    if !conflicts.is_empty() {
        return None;
    }
    let keys_of = |table: &Table| {
        table
            .schema()
            .indexes()
            .iter()
            .map(|index| index.name_key())
            .collect::<Vec<_>>()
    };
    let indexes: Vec<Index> = ordered(&indexes, keys_of(ours), keys_of(theirs));
    if !primary_key.iter().all(live) || !indexes.iter().all(|index| index.tags().iter().all(live)) {
        return None;
    }

    let tags = ours.schema().tag_space().union(theirs.schema().tag_space());
    let schema = Schema::from_parts(
        columns,
        primary_key,
        IndexCatalog::from_indexes(indexes),
        tags,
    );
    Some(ours.with_name(name).with_schema(schema))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    /// Keep a constraint added on their side under a new name even when one
    /// with the same definition was added on ours. When false the pair is a
    /// [`ConflictKind::DuplicateDefinition`] conflict and theirs is dropped.
    pub allow_duplicate_definitions: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            allow_duplicate_definitions: true,
        }
    }
}

/// Merge three foreign key collections by constraint name.
///
/// Table ids across the three collections must already agree. Display table
/// names are not compared, so a rename on one side does not count as a change
/// to the constraints touching that table; merged constraints may carry stale
/// display names until the caller refreshes them.
pub fn merge_foreign_keys(
    ancestor: &ForeignKeyCollection,
    ours: &ForeignKeyCollection,
    theirs: &ForeignKeyCollection,
    options: &MergeOptions,
) -> (ForeignKeyCollection, Vec<MergeConflict<ForeignKeyConstraint>>) {
    let (mut merged, mut conflicts) = merge_keyed(
        ancestor.as_map(),
        ours.as_map(),
        theirs.as_map(),
        |fk| fk.name.clone(),
        ForeignKeyConstraint::eq_ignoring_display_names,
    );

    if !options.allow_duplicate_definitions {
        let added = |side: &ForeignKeyCollection| -> Vec<ForeignKeyConstraint> {
            side.iter()
                .filter(|fk| !ancestor.contains(&fk.name))
                .cloned()
                .collect()
        };
        let ours_added: FxHashMap<ForeignKeyDefinition, ForeignKeyConstraint> = added(ours)
            .into_iter()
            .map(|fk| (fk.definition(), fk))
            .collect();
        for fk in added(theirs) {
            if ours.contains(&fk.name) {
                continue;
            }
            if let Some(existing) = ours_added.get(&fk.definition()) {
                tracing::debug!(
                    ours = %existing.name,
                    theirs = %fk.name,
                    "foreign key added on both sides under different names"
                );
                merged = merged.without(&fk.key());
                conflicts.push(MergeConflict {
                    name: fk.name.clone(),
                    kind: ConflictKind::DuplicateDefinition,
                    ancestor: None,
                    ours: Some(existing.clone()),
                    theirs: Some(fk),
                });
            }
        }
    }

    for conflict in &conflicts {
        tracing::warn!(
            "[MERGE] foreign key '{}' not merged: {}",
            conflict.name,
            conflict.kind
        );
    }
    (ForeignKeyCollection::from_map(merged), conflicts)
}

/// Outcome of [`merge_roots`]. Every problem is listed, none is fatal.
#[derive(Clone, Debug)]
pub struct RootMerge {
    pub root: Root,
    pub table_conflicts: Vec<MergeConflict<Arc<Table>>>,
    pub foreign_key_conflicts: Vec<MergeConflict<ForeignKeyConstraint>>,
    pub violations: Vec<IntegrityViolation>,
}

impl RootMerge {
    pub fn is_clean(&self) -> bool {
        self.table_conflicts.is_empty()
            && self.foreign_key_conflicts.is_empty()
            && self.violations.is_empty()
    }

    /// Names of every conflicting table and constraint.
    pub fn conflict_names(&self) -> Vec<String> {
        self.table_conflicts
            .iter()
            .map(|c| c.name.clone())
            .chain(self.foreign_key_conflicts.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// The merged root, or the first class of problem as an error.
    pub fn into_result(self) -> Result<Root> {
        if !self.table_conflicts.is_empty() || !self.foreign_key_conflicts.is_empty() {
            return Err(Error::MergeConflict {
                names: self.conflict_names(),
            });
        }
        if !self.violations.is_empty() {
            let mut seen = FxHashSet::default();
            let names = self
                .violations
                .iter()
                .filter(|v| seen.insert(v.constraint.clone()))
                .map(|v| v.constraint.clone())
                .collect();
            return Err(Error::PostMergeIntegrityViolation { names });
        }
        Ok(self.root)
    }
}

fn tables_by_id(root: &Root) -> OrdMap<TableId, Arc<Table>> {
    root.table_map()
        .values()
        .map(|table| (table.id(), Arc::clone(table)))
        .collect()
}

/// Give tables created on their side fresh ids when ours created a different
/// table under the same id.
///
/// Ids present in the ancestor name the same table on every side, whatever
/// either side renamed it to. A table both sides created under the same name
/// and id keeps it and is merged like any other.
fn remap_their_table_ids(
    ancestor: &Root,
    ours: &Root,
    theirs: &Root,
) -> Result<(Root, TableId)> {
    let ancestor_ids: FxHashSet<TableId> = ancestor.tables().map(Table::id).collect();
    let ours_by_id: FxHashMap<TableId, NameKey> = ours
        .table_map()
        .iter()
        .map(|(key, table)| (table.id(), key.clone()))
        .collect();
    let mut next_id = ours.next_table_id().max(theirs.next_table_id());
    let mut remap: FxHashMap<TableId, TableId> = FxHashMap::default();

    for (key, table) in theirs.table_map().iter() {
        if ancestor_ids.contains(&table.id()) {
            continue;
        }
        if ours_by_id.get(&table.id()).is_some_and(|owner| owner != key) {
            if next_id == TableId::MAX {
                return Err(Error::Internal("table id space exhausted during merge".into()));
            }
            tracing::debug!(
                table = %table.name(),
                from = table.id(),
                to = next_id,
                "re-numbering table created on both sides with the same id"
            );
            remap.insert(table.id(), next_id);
            next_id += 1;
        }
    }

    if remap.is_empty() {
        return Ok((theirs.clone(), next_id));
    }
    let tables = theirs
        .table_map()
        .iter()
        .map(|(key, table)| {
            let table = match remap.get(&table.id()) {
                Some(&id) => Arc::new(table.with_id(id)),
                None => Arc::clone(table),
            };
            (key.clone(), table)
        })
        .collect();
    let foreign_keys = theirs
        .foreign_key_collection()
        .with_remapped_tables(|id| remap.get(&id).copied());
    Ok((Root::from_parts(tables, foreign_keys, next_id), next_id))
}

/// Key the id-merged tables by name.
///
/// Independent renames and creations can put two tables on one name. The
/// table holding that name in ours keeps it. The other falls back to its
/// version in ours, or is left out when ours has none, and the clash is a
/// conflict.
fn index_by_name(
    merged: &OrdMap<TableId, Arc<Table>>,
    ancestor: &Root,
    ours: &Root,
    theirs: &Root,
    conflicts: &mut Vec<MergeConflict<Arc<Table>>>,
) -> OrdMap<NameKey, Arc<Table>> {
    let version = |root: &Root, id: TableId| root.table_by_id(id).cloned().map(Arc::new);
    let (settled, moved): (Vec<Arc<Table>>, Vec<Arc<Table>>) =
        merged.values().cloned().partition(|table| {
            ours.get_table(table.name())
                .is_some_and(|owner| owner.id() == table.id())
        });

    let mut tables: OrdMap<NameKey, Arc<Table>> = settled
        .into_iter()
        .map(|table| (table.name_key(), table))
        .collect();
    for table in moved {
        let key = table.name_key();
        let Some(holder) = tables.get(&key).cloned() else {
            tables.insert(key, table);
            continue;
        };
        let ancestor_version = version(ancestor, table.id());
        conflicts.push(MergeConflict {
            name: table.name().to_string(),
            kind: if ancestor_version.is_some() {
                ConflictKind::ModifyModify
            } else {
                ConflictKind::AddAdd
            },
            ancestor: ancestor_version,
            ours: Some(holder),
            theirs: version(theirs, table.id()),
        });
        if let Some(previous) = ours.table_by_id(table.id())
            && !tables.contains_key(&previous.name_key())
        {
            tables.insert(previous.name_key(), Arc::new(previous.clone()));
        }
    }
    tables
}

/// Three-way merge of two roots that diverged from `ancestor`.
pub fn merge_roots(
    ancestor: &Root,
    ours: &Root,
    theirs: &Root,
    options: &MergeOptions,
) -> Result<RootMerge> {
    let (theirs, next_table_id) = remap_their_table_ids(ancestor, ours, theirs)?;

    let (mut merged, conflicts) = merge_keyed(
        &tables_by_id(ancestor),
        &tables_by_id(ours),
        &tables_by_id(&theirs),
        |table| table.name().to_string(),
        |x, y| x == y,
    );
    let mut table_conflicts = Vec::new();
    for conflict in conflicts {
        if conflict.kind == ConflictKind::ModifyModify
            && let (Some(a), Some(o), Some(t)) =
                (&conflict.ancestor, &conflict.ours, &conflict.theirs)
            && let Some(table) = merge_table(a, o, t)
        {
            tracing::debug!(table = %table.name(), "merged concurrent changes to table");
            merged = merged.update(table.id(), Arc::new(table));
            continue;
        }
        table_conflicts.push(conflict);
    }
    let tables = index_by_name(&merged, ancestor, ours, &theirs, &mut table_conflicts);
    for conflict in &table_conflicts {
        tracing::warn!("[MERGE] table '{}' not merged: {}", conflict.name, conflict.kind);
    }

    let (mut foreign_keys, foreign_key_conflicts) = merge_foreign_keys(
        ancestor.foreign_key_collection(),
        ours.foreign_key_collection(),
        theirs.foreign_key_collection(),
        options,
    );
    for table in tables.values() {
        foreign_keys = foreign_keys.with_renamed_table(table.id(), table.name());
    }

    let root = Root::from_parts(tables, foreign_keys, next_table_id);
    let violations = validate_collection(root.foreign_key_collection(), &root);
    for violation in &violations {
        tracing::warn!("[MERGE] post-merge integrity violation: {}", violation);
    }
    tracing::debug!(
        tables = root.table_names().len(),
        foreign_keys = root.foreign_key_collection().len(),
        conflicts = table_conflicts.len() + foreign_key_conflicts.len(),
        violations = violations.len(),
        "merged roots"
    );

    Ok(RootMerge {
        root,
        table_conflicts,
        foreign_key_conflicts,
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Check {
        name: String,
        expr: String,
    }

    impl NamedSchemaObject for Check {
        fn object_name(&self) -> &str {
            &self.name
        }
    }

    fn map(items: &[(&str, &str)]) -> OrdMap<NameKey, Check> {
        items
            .iter()
            .map(|&(name, expr)| {
                (
                    NameKey::new(name),
                    Check {
                        name: name.to_string(),
                        expr: expr.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn one_sided_changes_merge_cleanly() {
        let ancestor = map(&[("keep", "x > 0"), ("edit", "y > 0"), ("gone", "z > 0")]);
        let ours = map(&[("keep", "x > 0"), ("edit", "y > 1"), ("gone", "z > 0"), ("new", "w")]);
        let theirs = map(&[("keep", "x > 0"), ("edit", "y > 0")]);
        let out = merge_named(&ancestor, &ours, &theirs);
        assert!(out.conflicts.is_empty());
        let merged: Vec<&str> = out.merged.values().map(|c| c.expr.as_str()).collect();
        assert_eq!(merged, vec!["y > 1", "x > 0", "w"]);
    }

    #[test]
    fn deleted_on_both_sides_stays_deleted() {
        let ancestor = map(&[("gone", "z")]);
        let out = merge_named(&ancestor, &map(&[]), &map(&[]));
        assert!(out.conflicts.is_empty());
        assert!(out.merged.is_empty());
    }

    #[test]
    fn divergent_changes_conflict_by_kind() {
        let ancestor = map(&[("mm", "a"), ("dm", "a"), ("md", "a")]);
        let ours = map(&[("mm", "b"), ("md", "b"), ("aa", "1")]);
        let theirs = map(&[("mm", "c"), ("dm", "c"), ("AA", "2")]);
        let out = merge_named(&ancestor, &ours, &theirs);
        let kinds: Vec<(String, ConflictKind)> = out
            .conflicts
            .iter()
            .map(|c| (c.name.clone(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("aa".to_string(), ConflictKind::AddAdd),
                ("dm".to_string(), ConflictKind::DeleteModify),
                ("md".to_string(), ConflictKind::ModifyDelete),
                ("mm".to_string(), ConflictKind::ModifyModify),
            ]
        );
        // Ours is kept for every conflicted entry.
        assert_eq!(out.merged.get(&NameKey::new("mm")).unwrap().expr, "b");
        assert!(out.merged.get(&NameKey::new("dm")).is_none());
        assert_eq!(
            out.conflicts[0].version(MergeSide::Theirs).unwrap().name,
            "AA"
        );
    }
}
