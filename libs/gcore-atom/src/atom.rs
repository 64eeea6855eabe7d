use std::fmt;

use gcore_refcount::{RefCount, RefCounted};

use crate::hash::case_insensitive_hash;

/// A heap-allocated, reference-counted interned string.
///
/// Equality and lookup are case-insensitive, but the original case a caller
/// passed to `find_or_create` is preserved for display and iteration.
pub struct Atom {
    refc: RefCount,
    hash: u32,
    name: String,
}

impl Atom {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            refc: RefCount::new(),
            hash: case_insensitive_hash(name),
            name: name.to_owned(),
        }
    }

    pub(crate) fn new_static(name: &str) -> Self {
        Self {
            refc: RefCount::new_static(),
            hash: case_insensitive_hash(name),
            name: name.to_owned(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str { &self.name }

    #[must_use]
    pub fn hash(&self) -> u32 { self.hash }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.name.is_empty() }

    #[must_use]
    pub fn eq_ignore_case(&self, other: &str) -> bool { self.name.eq_ignore_ascii_case(other) }
}

impl RefCounted for Atom {
    fn ref_count(&self) -> &RefCount { &self.refc }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom").field("name", &self.name).field("hash", &self.hash).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_original_case_but_compares_case_insensitively() {
        let atom = Atom::new("Root");
        assert_eq!(atom.as_str(), "Root");
        assert!(atom.eq_ignore_case("root"));
        assert!(atom.eq_ignore_case("ROOT"));
        assert!(!atom.eq_ignore_case("Rootx"));
    }

    #[test]
    fn empty_atom_has_hash_zero() {
        let atom = Atom::new("");
        assert_eq!(atom.hash(), 0);
        assert!(atom.is_empty());
    }
}
