//! Per-table tag allocation.
//!
//! Tags are append-only: once issued they stay reserved for the lifetime of
//! the table, even after the column that carried them is dropped, so a stale
//! reference can never alias a newer column.

#![forbid(unsafe_code)]

use bitcode::{Decode, Encode};

use crate::types::Tag;

/// Monotonic tag allocator owned by a table schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct TagSpace {
    /// Smallest tag strictly greater than every tag issued so far.
    next: Tag,
    /// Every tag ever issued, sorted ascending.
    issued: Vec<Tag>,
}

impl TagSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh tag.
    pub fn next_tag(&mut self) -> Tag {
        let tag = self.next;
        self.issued.push(tag);
        self.next = tag.saturating_add(1);
        tag
    }

    /// Record an explicitly chosen tag.
    ///
    /// Returns `false` if the tag was issued before. Later calls to
    /// [`TagSpace::next_tag`] never return a tag at or below the highest
    /// reserved one.
    pub fn reserve(&mut self, tag: Tag) -> bool {
        match self.issued.binary_search(&tag) {
            Ok(_) => false,
            Err(pos) => {
                self.issued.insert(pos, tag);
                if tag >= self.next {
                    self.next = tag.saturating_add(1);
                }
                true
            }
        }
    }

    /// Every tag issued by either space. Used when merging two histories of
    /// the same table.
    pub(crate) fn union(&self, other: &TagSpace) -> TagSpace {
        let mut issued: Vec<Tag> = self.issued.iter().chain(&other.issued).copied().collect();
        issued.sort_unstable();
        issued.dedup();
        TagSpace {
            next: self.next.max(other.next),
            issued,
        }
    }

    pub fn is_issued(&self, tag: Tag) -> bool {
        self.issued.binary_search(&tag).is_ok()
    }

    /// Tag the next call to [`TagSpace::next_tag`] would return.
    pub fn peek(&self) -> Tag {
        self.next
    }

    pub fn issued(&self) -> &[Tag] {
        &self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tags_are_monotonic() {
        let mut tags = TagSpace::new();
        assert_eq!(tags.next_tag(), 0);
        assert_eq!(tags.next_tag(), 1);
        assert!(tags.reserve(10));
        assert_eq!(tags.next_tag(), 11);
        assert_eq!(tags.issued(), &[0, 1, 10, 11]);
    }

    #[test]
    fn reserved_tags_are_never_reissued() {
        let mut tags = TagSpace::new();
        assert!(tags.reserve(5));
        assert!(!tags.reserve(5));
        // Gaps below the high-water mark stay available for explicit use only.
        assert!(tags.reserve(2));
        assert_eq!(tags.peek(), 6);
        assert!(tags.is_issued(2));
        assert!(!tags.is_issued(3));
    }
}
