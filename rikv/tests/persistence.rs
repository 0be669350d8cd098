mod common;

use common::{assert_indexes_back_constraints, base_root};
use rikv::{
    AddForeignKeyRequest, Error, ForeignKeyAction, ForeignKeyDef, RenameTableRequest, Root,
    SchemaDdl, decode_foreign_keys, encode_foreign_keys,
};

fn with_actions(on_update: ForeignKeyAction, on_delete: ForeignKeyAction) -> Root {
    base_root()
        .add_foreign_key(AddForeignKeyRequest::new(
            "child",
            ForeignKeyDef::new(["v1"], "parent", ["v1"])
                .named("child_fk")
                .on_update(on_update)
                .on_delete(on_delete),
        ))
        .expect("child_fk")
}

#[test]
fn root_survives_encode_decode() {
    let root = with_actions(ForeignKeyAction::Cascade, ForeignKeyAction::SetNull);
    let decoded = Root::decode(&root.encode()).expect("decode");
    assert_eq!(decoded, root);
    assert_indexes_back_constraints(&decoded);

    // Decoded roots keep allocating ids and tags where the original left off.
    let fk = decoded.foreign_key_collection().get("child_fk").unwrap();
    assert_eq!(fk.on_update, ForeignKeyAction::Cascade);
    assert_eq!(fk.on_delete, ForeignKeyAction::SetNull);
    assert_eq!(
        decoded.get_table("child").unwrap().schema().tag_space(),
        root.get_table("child").unwrap().schema().tag_space()
    );
}

#[test]
fn unspecified_and_no_action_stay_distinct() {
    let unspecified = with_actions(ForeignKeyAction::Default, ForeignKeyAction::Default);
    let explicit = with_actions(ForeignKeyAction::NoAction, ForeignKeyAction::NoAction);
    assert_ne!(unspecified, explicit);

    let a = Root::decode(&unspecified.encode()).unwrap();
    let b = Root::decode(&explicit.encode()).unwrap();
    let a = a.foreign_key_collection().get("child_fk").unwrap();
    let b = b.foreign_key_collection().get("child_fk").unwrap();
    assert_eq!(a.on_delete, ForeignKeyAction::Default);
    assert_eq!(b.on_delete, ForeignKeyAction::NoAction);
    assert_eq!(a.on_delete.effective(), b.on_delete.effective());
}

#[test]
fn display_names_follow_the_table_on_decode() {
    let root = with_actions(ForeignKeyAction::Default, ForeignKeyAction::Cascade);
    let bytes = encode_foreign_keys(root.foreign_key_collection());

    let renamed = root
        .rename_table(RenameTableRequest::new("parent", "mother"))
        .unwrap();
    let decoded = decode_foreign_keys(&bytes, |id| {
        renamed.table_by_id(id).map(|table| table.name().to_string())
    })
    .expect("decode collection");
    let fk = decoded.get("child_fk").unwrap();
    assert_eq!(fk.parent_table, "mother");
    assert_eq!(fk.child_table, "child");
    assert_eq!(&decoded, renamed.foreign_key_collection());
}

#[test]
fn corrupt_bytes_are_a_catalog_error() {
    let mut bytes = base_root().encode();
    bytes.truncate(bytes.len() / 2);
    assert!(matches!(Root::decode(&bytes), Err(Error::CatalogError(_))));
    assert!(matches!(
        decode_foreign_keys(b"not a foreign key collection", |_| None),
        Err(Error::CatalogError(_))
    ));
}
