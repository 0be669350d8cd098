//! Reserved values and fixed parameters.
//!
//! Centralizes the constants that generated names and identifiers depend on so
//! that persisted roots stay readable across releases.

use crate::ids::TableId;

/// Table ID that is never issued to a user table.
pub const RESERVED_TABLE_ID: TableId = 0;

/// First table ID handed out by a fresh root.
pub const FIRST_USER_TABLE_ID: TableId = 1;

/// Name of the implicit index covering a table's primary key.
pub const PRIMARY_KEY_INDEX_NAME: &str = "PRIMARY";

/// Length of generated foreign key names.
pub const GENERATED_NAME_LEN: usize = 8;

/// Alphabet generated foreign key names are drawn from (lowercase base32).
pub const GENERATED_NAME_ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Upper bound on draws when searching for an unused generated name.
pub const MAX_GENERATED_NAME_ATTEMPTS: usize = 1024;

#[inline]
pub fn is_reserved_table_id(id: TableId) -> bool {
    id == RESERVED_TABLE_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_user_table_is_not_reserved() {
        assert!(is_reserved_table_id(RESERVED_TABLE_ID));
        assert!(!is_reserved_table_id(FIRST_USER_TABLE_ID));
    }

    #[test]
    fn alphabet_has_no_duplicates() {
        let mut seen = [false; 256];
        for &b in GENERATED_NAME_ALPHABET {
            assert!(!seen[b as usize], "duplicate symbol {}", b as char);
            seen[b as usize] = true;
        }
    }
}
