//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use rikv::{
    AddIndexRequest, ColumnDef, CreateTableRequest, ForeignKeyConstraint, IndexDef, Root,
    SchemaDdl,
};
use rikv_test_utils::init_tracing_for_tests;

/// `parent(id tag 0, v1 tag 1, v2 tag 2)` with `v1_idx` and `v2_idx`, and
/// `child(id tag 10, v1 tag 11, v2 tag 12)` without secondary indexes.
pub fn base_root() -> Root {
    init_tracing_for_tests();
    Root::new()
        .create_table(
            CreateTableRequest::new("parent")
                .with_column(ColumnDef::new("id").with_tag(0))
                .with_column(ColumnDef::new("v1").with_tag(1))
                .with_column(ColumnDef::new("v2").with_tag(2))
                .with_primary_key(["id"]),
        )
        .and_then(|root| root.add_index(AddIndexRequest::new("parent", IndexDef::named("v1_idx", ["v1"]))))
        .and_then(|root| root.add_index(AddIndexRequest::new("parent", IndexDef::named("v2_idx", ["v2"]))))
        .and_then(|root| {
            root.create_table(
                CreateTableRequest::new("child")
                    .with_column(ColumnDef::new("id").with_tag(10))
                    .with_column(ColumnDef::new("v1").with_tag(11))
                    .with_column(ColumnDef::new("v2").with_tag(12))
                    .with_primary_key(["id"]),
            )
        })
        .expect("base schema")
}

pub fn add_index(root: Root, table: &str, name: &str, columns: &[&str]) -> Root {
    root.add_index(AddIndexRequest::new(
        table,
        IndexDef::named(name, columns.iter().copied()),
    ))
    .unwrap_or_else(|err| panic!("add index {name} on {table}: {err}"))
}

/// Both index invariants for every constraint in `root`.
pub fn assert_indexes_back_constraints(root: &Root) {
    for fk in root.foreign_key_collection().iter() {
        assert_index_matches(root, &fk.parent_table, &fk.parent_index, &fk.parent_columns, fk);
        assert_index_matches(root, &fk.child_table, &fk.child_index, &fk.child_columns, fk);
    }
    assert!(
        root.validate_foreign_keys().is_empty(),
        "violations: {:?}",
        root.validate_foreign_keys()
    );
}

fn assert_index_matches(
    root: &Root,
    table: &str,
    index: &str,
    tags: &[u64],
    fk: &ForeignKeyConstraint,
) {
    let table = root
        .get_table(table)
        .unwrap_or_else(|| panic!("table {table} of {} missing", fk.name));
    let idx = table
        .schema()
        .indexes()
        .get_by_name_case_insensitive(index)
        .unwrap_or_else(|| panic!("index {index} of {} missing", fk.name));
    assert_eq!(idx.tags(), tags, "index {index} of {}", fk.name);
}
