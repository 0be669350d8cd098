use std::fmt;
use thiserror::Error;

/// Unified error type for all rikv operations.
///
/// Variants carry the user-visible names involved (tables, columns, indexes,
/// constraints) so a DDL front end can render a message without consulting the
/// schema again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A table name does not resolve in the current root.
    #[error("table '{0}' does not exist")]
    UnknownTable(String),

    /// A column name does not exist in the target table's current schema.
    #[error("column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// An index name does not exist in the target table's index catalog.
    #[error("index '{index}' does not exist on table '{table}'")]
    UnknownIndex { table: String, index: String },

    /// A foreign key name does not exist in the collection.
    #[error("foreign key '{0}' does not exist")]
    UnknownForeignKey(String),

    /// The referenced table has no index whose tag sequence exactly matches the
    /// requested columns.
    ///
    /// Parent-side indexes are never synthesized: the referenced columns must
    /// already be covered, typically by the primary key or a previously
    /// declared secondary index.
    #[error("missing index for foreign key: table '{table}' has no index on ({})", .columns.join(", "))]
    NoMatchingParentIndex { table: String, columns: Vec<String> },

    /// An explicit constraint name collides (case-insensitively) with an
    /// existing constraint.
    #[error("a foreign key named '{0}' already exists")]
    DuplicateConstraintName(String),

    /// An index name collides (case-insensitively) with an existing index on
    /// the same table.
    #[error("index '{index}' already exists on table '{table}'")]
    DuplicateIndexName { table: String, index: String },

    /// A table name collides (case-insensitively) with an existing table.
    #[error("table '{0}' already exists")]
    DuplicateTableName(String),

    /// A column name collides (case-insensitively) with an existing column.
    #[error("column '{column}' already exists in table '{table}'")]
    DuplicateColumnName { table: String, column: String },

    /// An explicitly requested tag was already issued by the table's tag space.
    #[error("tag {tag} has already been issued in table '{table}'")]
    DuplicateTag { table: String, tag: u64 },

    /// Dropping the column would orphan a live foreign key.
    #[error("cannot drop column '{column}' of table '{table}': it is used by foreign key '{constraint}'")]
    ColumnUsedByForeignKey {
        table: String,
        column: String,
        constraint: String,
    },

    /// Dropping the index would orphan a live foreign key.
    #[error("cannot drop index '{index}' of table '{table}': it is needed by foreign key '{constraint}'")]
    IndexUsedByForeignKey {
        table: String,
        index: String,
        constraint: String,
    },

    /// Dropping the table would orphan a foreign key declared on another table.
    #[error("cannot drop table '{table}': it is referenced by foreign key '{constraint}'")]
    TableReferencedByForeignKey { table: String, constraint: String },

    /// Divergent definitions of the listed objects could not be reconciled.
    ///
    /// Merges report conflicts as structured results; this variant is produced
    /// only when a caller asks to turn such a result into a hard failure.
    #[error("merge conflict on: {}", .names.join(", "))]
    MergeConflict { names: Vec<String> },

    /// The listed constraints fail the foreign key invariants after a merge.
    #[error("foreign keys violate integrity after merge: {}", .names.join(", "))]
    PostMergeIntegrityViolation { names: Vec<String> },

    /// Invalid user input or API parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Persisted catalog metadata could not be decoded or is inconsistent.
    #[error("{0}")]
    CatalogError(String),

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a decoding failure as a catalog error prefixed with `context`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rikv_result::Error;
    ///
    /// let err = Error::catalog("failed to decode root", "unexpected end of input");
    /// assert!(matches!(
    ///     err,
    ///     Error::CatalogError(msg) if msg == "failed to decode root: unexpected end of input"
    /// ));
    /// ```
    #[inline]
    pub fn catalog<E: fmt::Display>(context: &str, err: E) -> Self {
        Error::CatalogError(format!("{context}: {err}"))
    }

    /// Whether this error reports a merge outcome rather than a rejected DDL
    /// request.
    #[inline]
    pub fn is_merge_error(&self) -> bool {
        matches!(
            self,
            Error::MergeConflict { .. } | Error::PostMergeIntegrityViolation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_objects() {
        let err = Error::NoMatchingParentIndex {
            table: "parent".into(),
            columns: vec!["v1".into(), "v2".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing index for foreign key: table 'parent' has no index on (v1, v2)"
        );

        let err = Error::ColumnUsedByForeignKey {
            table: "child".into(),
            column: "v1".into(),
            constraint: "child_fk".into(),
        };
        assert!(err.to_string().contains("child_fk"));
    }

    #[test]
    fn merge_errors_are_classified() {
        assert!(Error::MergeConflict { names: vec!["fk1".into()] }.is_merge_error());
        assert!(!Error::DuplicateConstraintName("fk1".into()).is_merge_error());
    }
}
