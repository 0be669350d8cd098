//! Schema DDL requests and the trait that applies them.
//!
//! Request types are what a front end produces after parsing; column and
//! table references are still names. [`SchemaDdl`] is implemented for
//! [`Root`], where every operation returns a new root.

#![forbid(unsafe_code)]

use rikv_result::{Error, Result};

use crate::constraints::mutation;
use crate::constraints::{ForeignKeyAction, resolve_foreign_key};
use crate::root::Root;
use crate::schema::ColumnDef;
use crate::table::{Table, ensure_distinct};

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// A declared foreign key, as written in `FOREIGN KEY ... REFERENCES ...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    /// Child index to use or create under this name.
    pub index: Option<String>,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
    pub parent_index: Option<String>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

impl ForeignKeyDef {
    pub fn new<C, P, S, T>(columns: C, parent_table: impl Into<String>, parent_columns: P) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: None,
            columns: strings(columns),
            index: None,
            parent_table: parent_table.into(),
            parent_columns: strings(parent_columns),
            parent_index: None,
            on_update: ForeignKeyAction::Default,
            on_delete: ForeignKeyAction::Default,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_parent_index(mut self, index: impl Into<String>) -> Self {
        self.parent_index = Some(index.into());
        self
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// `ALTER TABLE <table> ADD [CONSTRAINT <name>] FOREIGN KEY ...`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddForeignKeyRequest {
    pub table: String,
    pub foreign_key: ForeignKeyDef,
}

impl AddForeignKeyRequest {
    pub fn new(table: impl Into<String>, foreign_key: ForeignKeyDef) -> Self {
        Self {
            table: table.into(),
            foreign_key,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropForeignKeyRequest {
    pub name: String,
}

impl DropForeignKeyRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A secondary index definition. Unnamed indexes are named after their
/// columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: strings(columns),
            unique: false,
        }
    }

    pub fn named<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Some(name.into()),
            ..Self::new(columns)
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTableRequest {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl CreateTableRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<ColumnDef>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = strings(columns);
        self
    }

    pub fn with_index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropTableRequest {
    pub table: String,
    /// Also drop constraints on other tables that reference this one.
    pub cascade: bool,
}

impl DropTableRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            cascade: false,
        }
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameTableRequest {
    pub from: String,
    pub to: String,
}

impl RenameTableRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddColumnRequest {
    pub table: String,
    pub column: ColumnDef,
}

impl AddColumnRequest {
    pub fn new(table: impl Into<String>, column: impl Into<ColumnDef>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropColumnRequest {
    pub table: String,
    pub column: String,
    /// Drop the foreign keys using this column instead of failing.
    pub cascade: bool,
}

impl DropColumnRequest {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            cascade: false,
        }
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameColumnRequest {
    pub table: String,
    pub from: String,
    pub to: String,
}

impl RenameColumnRequest {
    pub fn new(table: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddIndexRequest {
    pub table: String,
    pub index: IndexDef,
}

impl AddIndexRequest {
    pub fn new(table: impl Into<String>, index: IndexDef) -> Self {
        Self {
            table: table.into(),
            index,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropIndexRequest {
    pub table: String,
    pub index: String,
    /// Drop the foreign keys backed by this index when no replacement exists.
    pub cascade: bool,
}

impl DropIndexRequest {
    pub fn new(table: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            index: index.into(),
            cascade: false,
        }
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameIndexRequest {
    pub table: String,
    pub from: String,
    pub to: String,
}

impl RenameIndexRequest {
    pub fn new(table: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Schema mutations shared by every layer that holds a root.
///
/// Implementors choose what an operation yields through [`SchemaDdl::Output`];
/// for [`Root`] it is the new root.
pub trait SchemaDdl {
    type Output;

    /// Create a table with its indexes, then resolve its inline foreign keys
    /// in declaration order.
    fn create_table(&self, request: CreateTableRequest) -> Result<Self::Output>;

    fn drop_table(&self, request: DropTableRequest) -> Result<Self::Output>;

    fn rename_table(&self, request: RenameTableRequest) -> Result<Self::Output>;

    fn add_column(&self, request: AddColumnRequest) -> Result<Self::Output>;

    fn drop_column(&self, request: DropColumnRequest) -> Result<Self::Output>;

    fn rename_column(&self, request: RenameColumnRequest) -> Result<Self::Output>;

    fn add_index(&self, request: AddIndexRequest) -> Result<Self::Output>;

    fn drop_index(&self, request: DropIndexRequest) -> Result<Self::Output>;

    fn rename_index(&self, request: RenameIndexRequest) -> Result<Self::Output>;

    fn add_foreign_key(&self, request: AddForeignKeyRequest) -> Result<Self::Output>;

    /// Remove a constraint. Its child index stays.
    fn drop_foreign_key(&self, request: DropForeignKeyRequest) -> Result<Self::Output>;
}

fn with_index_def(table: &Table, def: &IndexDef) -> Result<Table> {
    let tags = table.resolve_columns(&def.columns)?;
    ensure_distinct(table.name(), &def.columns, &tags)?;
    let name = match &def.name {
        Some(name) => name.clone(),
        None => table
            .schema()
            .indexes()
            .unused_name_for_columns(&table.column_names(&tags)),
    };
    tracing::trace!(table = %table.name(), index = %name, "adding index");
    table.with_index(&name, tags, def.unique)
}

impl SchemaDdl for Root {
    type Output = Root;

    fn create_table(&self, request: CreateTableRequest) -> Result<Root> {
        if self.get_table(&request.name).is_some() {
            return Err(Error::DuplicateTableName(request.name));
        }
        let id = self.allocate_table_id()?;
        let mut table = Table::create(id, &request.name, &request.columns, &request.primary_key)?;
        for def in &request.indexes {
            table = with_index_def(&table, def)?;
        }
        tracing::debug!(
            table = %request.name,
            table_id = id,
            columns = request.columns.len(),
            foreign_keys = request.foreign_keys.len(),
            "creating table"
        );

        let mut root = self.put_table(table);
        for foreign_key in request.foreign_keys {
            let add = AddForeignKeyRequest::new(request.name.clone(), foreign_key);
            root = resolve_foreign_key(&root, &add)?.root;
        }
        Ok(root)
    }

    fn drop_table(&self, request: DropTableRequest) -> Result<Root> {
        mutation::drop_table(self, &request.table, request.cascade)
    }

    fn rename_table(&self, request: RenameTableRequest) -> Result<Root> {
        mutation::rename_table(self, &request.from, &request.to)
    }

    fn add_column(&self, request: AddColumnRequest) -> Result<Root> {
        let table = self
            .get_table(&request.table)
            .ok_or_else(|| Error::UnknownTable(request.table.clone()))?;
        let (table, tag) = table.with_column(&request.column)?;
        tracing::trace!(table = %request.table, column = %request.column.name, tag, "adding column");
        Ok(self.put_table(table))
    }

    fn drop_column(&self, request: DropColumnRequest) -> Result<Root> {
        mutation::drop_column(self, &request.table, &request.column, request.cascade)
    }

    /// Constraints record tags, so renaming a column leaves them untouched.
    fn rename_column(&self, request: RenameColumnRequest) -> Result<Root> {
        let table = self
            .get_table(&request.table)
            .ok_or_else(|| Error::UnknownTable(request.table.clone()))?;
        Ok(self.put_table(table.with_renamed_column(&request.from, &request.to)?))
    }

    fn add_index(&self, request: AddIndexRequest) -> Result<Root> {
        let table = self
            .get_table(&request.table)
            .ok_or_else(|| Error::UnknownTable(request.table.clone()))?;
        Ok(self.put_table(with_index_def(table, &request.index)?))
    }

    fn drop_index(&self, request: DropIndexRequest) -> Result<Root> {
        mutation::drop_index(self, &request.table, &request.index, request.cascade)
    }

    fn rename_index(&self, request: RenameIndexRequest) -> Result<Root> {
        mutation::rename_index(self, &request.table, &request.from, &request.to)
    }

    fn add_foreign_key(&self, request: AddForeignKeyRequest) -> Result<Root> {
        Ok(resolve_foreign_key(self, &request)?.root)
    }

    fn drop_foreign_key(&self, request: DropForeignKeyRequest) -> Result<Root> {
        let collection = self.foreign_key_collection().without_key(&request.name)?;
        tracing::debug!(constraint = %request.name, "dropped foreign key");
        Ok(self.put_foreign_key_collection(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> CreateTableRequest {
        CreateTableRequest::new("parent")
            .with_column("id")
            .with_column("v1")
            .with_column("v2")
            .with_primary_key(["id"])
            .with_index(IndexDef::new(["v1", "v2"]))
    }

    #[test]
    fn create_table_names_unnamed_indexes_after_columns() {
        let root = Root::new().create_table(parent()).unwrap();
        let table = root.get_table("parent").unwrap();
        assert_eq!(table.id(), 1);
        assert!(table.schema().indexes().contains_name("v1_v2"));
        assert_eq!(
            Root::new()
                .create_table(parent())
                .and_then(|root| root.create_table(parent()))
                .unwrap_err(),
            Error::DuplicateTableName("parent".into())
        );
    }

    #[test]
    fn self_referencing_table_resolves_in_create() {
        let root = Root::new()
            .create_table(
                CreateTableRequest::new("employee")
                    .with_column("id")
                    .with_column("manager_id")
                    .with_primary_key(["id"])
                    .with_foreign_key(ForeignKeyDef::new(["manager_id"], "employee", ["id"])),
            )
            .unwrap();
        let fk = root.foreign_key_collection().iter().next().unwrap();
        assert!(fk.is_self_referential());
        assert_eq!(fk.child_index, "manager_id");
        assert_eq!(fk.parent_index, "PRIMARY");
        assert!(root.validate_foreign_keys().is_empty());
    }

    #[test]
    fn failed_inline_foreign_key_fails_the_whole_create() {
        let err = Root::new()
            .create_table(parent())
            .and_then(|root| {
                root.create_table(
                    CreateTableRequest::new("child")
                        .with_column("id")
                        .with_column("v2")
                        .with_foreign_key(ForeignKeyDef::new(["v2"], "parent", ["v2"])),
                )
            })
            .unwrap_err();
        assert!(matches!(err, Error::NoMatchingParentIndex { .. }));
    }

    #[test]
    fn drop_foreign_key_keeps_child_index() {
        let root = Root::new()
            .create_table(parent())
            .and_then(|root| {
                root.create_table(
                    CreateTableRequest::new("child")
                        .with_column("id")
                        .with_column("v1")
                        .with_column("v2")
                        .with_foreign_key(
                            ForeignKeyDef::new(["v1", "v2"], "parent", ["v1", "v2"]).named("fk"),
                        ),
                )
            })
            .and_then(|root| root.drop_foreign_key(DropForeignKeyRequest::new("FK")))
            .unwrap();
        assert!(root.foreign_key_collection().is_empty());
        let child = root.get_table("child").unwrap();
        assert!(child.schema().indexes().contains_name("v1_v2"));
        assert!(matches!(
            root.drop_foreign_key(DropForeignKeyRequest::new("fk")),
            Err(Error::UnknownForeignKey(_))
        ));
    }
}
