//! Foreign key constraint definitions.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use bitcode::{Decode, Encode};
use rikv_result::Error;

use crate::names::{NameKey, names_equal};
use crate::types::{TableId, Tag};

/// Referential action applied on the referencing side when the referenced
/// row changes.
///
/// `Default` records that the DDL did not specify an action; it behaves as
/// [`ForeignKeyAction::NoAction`] but is kept distinct so that a persisted
/// constraint reproduces exactly what was declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Encode, Decode)]
pub enum ForeignKeyAction {
    #[default]
    Default,
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl ForeignKeyAction {
    pub const ALL: [ForeignKeyAction; 5] = [
        ForeignKeyAction::Default,
        ForeignKeyAction::Cascade,
        ForeignKeyAction::Restrict,
        ForeignKeyAction::SetNull,
        ForeignKeyAction::NoAction,
    ];

    /// The action actually enforced.
    #[inline]
    pub const fn effective(self) -> Self {
        match self {
            ForeignKeyAction::Default => ForeignKeyAction::NoAction,
            other => other,
        }
    }

    #[inline]
    pub const fn is_specified(self) -> bool {
        !matches!(self, ForeignKeyAction::Default)
    }

    pub const fn as_sql(self) -> &'static str {
        match self.effective() {
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::SetNull => "SET NULL",
            _ => "NO ACTION",
        }
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ForeignKeyAction {
    type Err = Error;

    /// Parse the SQL spelling of a referential action.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "CASCADE" => Ok(ForeignKeyAction::Cascade),
            "RESTRICT" => Ok(ForeignKeyAction::Restrict),
            "SET NULL" => Ok(ForeignKeyAction::SetNull),
            "NO ACTION" => Ok(ForeignKeyAction::NoAction),
            _ => Err(Error::InvalidArgumentError(format!(
                "unknown referential action '{s}'"
            ))),
        }
    }
}

/// A fully resolved foreign key.
///
/// Columns are recorded as tags, never names. `child_table` and
/// `parent_table` are display names denormalized from the root and refreshed
/// whenever a table is renamed; the table ids are authoritative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub child_table_id: TableId,
    pub child_table: String,
    pub child_index: String,
    pub child_columns: Vec<Tag>,
    pub parent_table_id: TableId,
    pub parent_table: String,
    pub parent_index: String,
    pub parent_columns: Vec<Tag>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

/// Everything about a constraint except its name.
///
/// Two constraints with equal definitions enforce the same rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ForeignKeyDefinition {
    pub child_table_id: TableId,
    pub child_index: NameKey,
    pub child_columns: Vec<Tag>,
    pub parent_table_id: TableId,
    pub parent_index: NameKey,
    pub parent_columns: Vec<Tag>,
}

impl ForeignKeyConstraint {
    pub fn key(&self) -> NameKey {
        NameKey::new(&self.name)
    }

    pub fn is_self_referential(&self) -> bool {
        self.child_table_id == self.parent_table_id
    }

    /// Whether `tag` of `table_id` participates on either side.
    pub fn uses_tag(&self, table_id: TableId, tag: Tag) -> bool {
        (self.child_table_id == table_id && self.child_columns.contains(&tag))
            || (self.parent_table_id == table_id && self.parent_columns.contains(&tag))
    }

    /// Whether the index named `index` on `table_id` backs either side.
    pub fn uses_index(&self, table_id: TableId, index: &str) -> bool {
        (self.child_table_id == table_id && names_equal(&self.child_index, index))
            || (self.parent_table_id == table_id && names_equal(&self.parent_index, index))
    }

    pub fn involves_table(&self, table_id: TableId) -> bool {
        self.child_table_id == table_id || self.parent_table_id == table_id
    }

    /// Equality over everything but `child_table` and `parent_table`.
    pub fn eq_ignoring_display_names(&self, other: &Self) -> bool {
        self.name == other.name
            && self.child_table_id == other.child_table_id
            && self.child_index == other.child_index
            && self.child_columns == other.child_columns
            && self.parent_table_id == other.parent_table_id
            && self.parent_index == other.parent_index
            && self.parent_columns == other.parent_columns
            && self.on_update == other.on_update
            && self.on_delete == other.on_delete
    }

    pub fn definition(&self) -> ForeignKeyDefinition {
        ForeignKeyDefinition {
            child_table_id: self.child_table_id,
            child_index: NameKey::new(&self.child_index),
            child_columns: self.child_columns.clone(),
            parent_table_id: self.parent_table_id,
            parent_index: NameKey::new(&self.parent_index),
            parent_columns: self.parent_columns.clone(),
        }
    }

    /// Point every side backed by index `from` on `table_id` at index `to`.
    pub(crate) fn repoint_index(&mut self, table_id: TableId, from: &str, to: &str) {
        if self.child_table_id == table_id && names_equal(&self.child_index, from) {
            self.child_index = to.to_string();
        }
        if self.parent_table_id == table_id && names_equal(&self.parent_index, from) {
            self.parent_index = to.to_string();
        }
    }

    pub(crate) fn rename_table(&mut self, table_id: TableId, name: &str) {
        if self.child_table_id == table_id {
            self.child_table = name.to_string();
        }
        if self.parent_table_id == table_id {
            self.parent_table = name.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_action_behaves_as_no_action() {
        assert_eq!(ForeignKeyAction::default(), ForeignKeyAction::Default);
        assert_eq!(
            ForeignKeyAction::Default.effective(),
            ForeignKeyAction::NoAction
        );
        assert!(!ForeignKeyAction::Default.is_specified());
        assert!(ForeignKeyAction::NoAction.is_specified());
        assert_ne!(ForeignKeyAction::Default, ForeignKeyAction::NoAction);
    }

    #[test]
    fn display_names_do_not_affect_rule_equality() {
        let fk = ForeignKeyConstraint {
            name: "fk".into(),
            child_table_id: 2,
            child_table: "child".into(),
            child_index: "v1_idx".into(),
            child_columns: vec![11],
            parent_table_id: 1,
            parent_table: "parent".into(),
            parent_index: "v1_idx".into(),
            parent_columns: vec![1],
            on_update: ForeignKeyAction::Default,
            on_delete: ForeignKeyAction::Default,
        };
        let mut renamed = fk.clone();
        renamed.rename_table(1, "mother");
        assert_ne!(renamed, fk);
        assert!(renamed.eq_ignoring_display_names(&fk));

        let cascading = ForeignKeyConstraint {
            on_delete: ForeignKeyAction::Cascade,
            ..fk.clone()
        };
        assert!(!cascading.eq_ignoring_display_names(&fk));
    }

    #[test]
    fn actions_parse_from_sql() {
        assert_eq!(
            "set   null".parse::<ForeignKeyAction>().unwrap(),
            ForeignKeyAction::SetNull
        );
        assert_eq!(
            "No Action".parse::<ForeignKeyAction>().unwrap(),
            ForeignKeyAction::NoAction
        );
        assert!("set default".parse::<ForeignKeyAction>().is_err());
        assert_eq!(ForeignKeyAction::Cascade.to_string(), "CASCADE");
    }
}
