//! Case-insensitive name keys.
//!
//! Table, column, index and constraint names compare case-insensitively while
//! the original spelling is preserved for display. [`NameKey`] is the folded
//! form used for map keys and equality checks.

use std::fmt;

/// Canonical (lowercase) key for name lookups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `name` folds to this key.
    pub fn matches(&self, name: &str) -> bool {
        self.0.len() == name.len() && self.0.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NameKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&String> for NameKey {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

/// Case-insensitive name equality.
#[inline]
pub fn names_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_fold_case_but_keep_order() {
        assert_eq!(NameKey::new("Child_FK"), NameKey::new("child_fk"));
        assert!(NameKey::new("ABC") < NameKey::new("abd"));
        assert!(NameKey::new("v1_IDX").matches("V1_idx"));
        assert!(!NameKey::new("v1").matches("v1_idx"));
    }
}
