/// Stable column identifier.
///
/// A tag is issued once, when a column is created, and is never reassigned or
/// reused within the owning table's lifetime, including after the column is
/// dropped. Renames and reorderings leave tags untouched, which makes tags the
/// only safe way to refer to "the same column" across schema versions.
pub type Tag = u64;

/// Unique identifier for a table within a root.
///
/// # Special Values
///
/// - Table ID `0` is reserved (see [`crate::reserved::RESERVED_TABLE_ID`])
/// - User tables receive IDs starting from `1`
pub type TableId = u16;
