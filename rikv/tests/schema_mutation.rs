mod common;

use common::{add_index, assert_indexes_back_constraints, base_root};
use rikv::{
    AddForeignKeyRequest, DropColumnRequest, DropIndexRequest, DropTableRequest, Error,
    ForeignKeyDef, RenameColumnRequest, RenameIndexRequest, RenameTableRequest, Root, SchemaDdl,
};

fn with_child_fk() -> Root {
    base_root()
        .add_foreign_key(AddForeignKeyRequest::new(
            "child",
            ForeignKeyDef::new(["v1"], "parent", ["v1"]).named("child_fk"),
        ))
        .expect("child_fk")
}

#[test]
fn dropping_a_referenced_column_fails_without_cascade() {
    let root = with_child_fk();
    for (table, column) in [("child", "v1"), ("parent", "v1")] {
        let err = root
            .drop_column(DropColumnRequest::new(table, column))
            .unwrap_err();
        assert!(
            matches!(err, Error::ColumnUsedByForeignKey { ref constraint, .. } if constraint == "child_fk"),
            "{err}"
        );
    }
    // Nothing changed.
    assert!(root.get_table("child").unwrap().schema().column_by_name("v1").is_some());
}

#[test]
fn cascading_column_drop_removes_dependents_atomically() {
    let root = with_child_fk()
        .drop_column(DropColumnRequest::new("parent", "v1").cascade())
        .expect("cascade drop");
    assert!(root.foreign_key_collection().is_empty());
    let parent = root.get_table("parent").unwrap();
    assert!(parent.schema().column_by_name("v1").is_none());
    assert!(!parent.schema().indexes().contains_name("v1_idx"));
    // The child-side index outlives the constraint.
    assert!(
        root.get_table("child")
            .unwrap()
            .schema()
            .indexes()
            .contains_name("v1")
    );
    assert_indexes_back_constraints(&root);
}

#[test]
fn dropped_tags_are_never_reissued() {
    let root = base_root()
        .drop_column(DropColumnRequest::new("child", "v2"))
        .and_then(|root| root.add_column(rikv::AddColumnRequest::new("child", "v2")))
        .expect("drop and re-add");
    let v2 = root.get_table("child").unwrap().schema().column_by_name("v2").unwrap().tag;
    assert_ne!(v2, 12);
    assert!(v2 > 12);
}

#[test]
fn dropping_a_backing_index_needs_a_replacement_or_cascade() {
    let root = with_child_fk();
    assert_eq!(
        root.drop_index(DropIndexRequest::new("parent", "v1_idx")).unwrap_err(),
        Error::IndexUsedByForeignKey {
            table: "parent".into(),
            index: "v1_idx".into(),
            constraint: "child_fk".into(),
        }
    );

    // A prefix-compatible index is not a replacement.
    let with_composite = add_index(root.clone(), "parent", "v1v2_idx", &["v1", "v2"]);
    assert!(matches!(
        with_composite.drop_index(DropIndexRequest::new("parent", "v1_idx")),
        Err(Error::IndexUsedByForeignKey { .. })
    ));

    let with_copy = add_index(root.clone(), "parent", "v1_copy", &["v1"]);
    let dropped = with_copy
        .drop_index(DropIndexRequest::new("parent", "V1_IDX"))
        .expect("drop with replacement");
    assert_eq!(
        dropped.foreign_key_collection().get("child_fk").unwrap().parent_index,
        "v1_copy"
    );
    assert_indexes_back_constraints(&dropped);

    let cascaded = root
        .drop_index(DropIndexRequest::new("child", "v1").cascade())
        .expect("cascade");
    assert!(cascaded.foreign_key_collection().is_empty());
}

#[test]
fn unreferenced_index_drops_freely() {
    let root = with_child_fk()
        .drop_index(DropIndexRequest::new("parent", "v2_idx"))
        .expect("drop v2_idx");
    assert!(!root.get_table("parent").unwrap().schema().indexes().contains_name("v2_idx"));
    assert_eq!(root.foreign_key_collection().len(), 1);
}

#[test]
fn renames_keep_constraints_valid() {
    let root = with_child_fk()
        .rename_column(RenameColumnRequest::new("parent", "v1", "w1"))
        .and_then(|root| root.rename_column(RenameColumnRequest::new("child", "v1", "parent_w1")))
        .and_then(|root| root.rename_table(RenameTableRequest::new("parent", "Mother")))
        .and_then(|root| root.rename_index(RenameIndexRequest::new("mother", "v1_idx", "w1_idx")))
        .expect("renames");

    let fk = root.foreign_key_collection().get("child_fk").unwrap();
    assert_eq!(fk.parent_table, "Mother");
    assert_eq!(fk.parent_index, "w1_idx");
    assert_eq!(fk.parent_columns, vec![1]);
    assert_eq!(fk.child_columns, vec![11]);
    assert_eq!(fk.child_index, "v1");
    assert_indexes_back_constraints(&root);

    assert_eq!(
        root.rename_table(RenameTableRequest::new("child", "mother")).unwrap_err(),
        Error::DuplicateTableName("mother".into())
    );
}

#[test]
fn dropping_tables() {
    let root = with_child_fk();
    assert_eq!(
        root.drop_table(DropTableRequest::new("parent")).unwrap_err(),
        Error::TableReferencedByForeignKey {
            table: "parent".into(),
            constraint: "child_fk".into(),
        }
    );

    let without_child = root.drop_table(DropTableRequest::new("child")).expect("drop child");
    assert!(without_child.foreign_key_collection().is_empty());

    let without_parent = root
        .drop_table(DropTableRequest::new("parent").cascade())
        .expect("drop parent");
    assert!(without_parent.foreign_key_collection().is_empty());
    assert_eq!(without_parent.table_names(), vec!["child"]);

    // Older roots are unaffected by any of the above.
    assert_eq!(root.foreign_key_collection().len(), 1);
    assert_eq!(root.table_names(), vec!["child", "parent"]);
}
