use std::{cell::UnsafeCell, fmt, ops::Deref};

use gcore_refcount::Rc;
use gcore_sync::ThreadLock;
use once_cell::sync::Lazy;

use crate::atom::Atom;

struct Indexes {
    by_name: Vec<Rc<Atom>>,
    by_hash: Vec<Rc<Atom>>,
    static_keep: Vec<Rc<Atom>>,
}

/// The process-wide atom interning table: a name-sorted index, a
/// hash-sorted index, and a static-keep list, all serialized by one
/// re-entrant lock.
///
/// Modeled on the global-singleton-behind-a-lock shape used for process
/// state elsewhere in this codebase, with [`ThreadLock`] standing in for
/// the re-entrant mutex the manager's own removal path needs (a
/// destructor running while the lock is held must be able to re-acquire
/// it).
pub struct AtomTable {
    lock: ThreadLock,
    data: UnsafeCell<Indexes>,
    empty: Rc<Atom>,
}

// SAFETY: every access to `data` happens while `lock` is held, which
// serializes readers and writers the same way a `Mutex` would.
unsafe impl Sync for AtomTable {}

static TABLE: Lazy<AtomTable> = Lazy::new(AtomTable::new);

impl AtomTable {
    fn new() -> Self {
        Self {
            lock: ThreadLock::new(),
            data: UnsafeCell::new(Indexes {
                by_name: Vec::new(),
                by_hash: Vec::new(),
                static_keep: Vec::new(),
            }),
            empty: Rc::new(Atom::new_static("")),
        }
    }

    #[must_use]
    pub fn global() -> &'static AtomTable { &TABLE }

    /// Returns the existing atom if `name` is already interned
    /// (case-insensitively), otherwise allocates and inserts a new one.
    #[must_use]
    pub fn find_or_create(&self, name: &str) -> AtomRef {
        if name.is_empty() {
            return AtomRef::new(self.empty.clone());
        }
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `data`.
        let data = unsafe { &mut *self.data.get() };
        match locate_name(data, name) {
            Ok(idx) => AtomRef::new(data.by_name[idx].clone()),
            Err(insert_at) => {
                let atom = Rc::new(Atom::new(name));
                data.by_name.insert(insert_at, atom.clone());
                let pos = hash_range(data, atom.hash()).end;
                data.by_hash.insert(pos, atom.clone());
                AtomRef::new(atom)
            },
        }
    }

    /// Looks up `name` without creating it. Never allocates.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<AtomRef> {
        if name.is_empty() {
            return Some(AtomRef::new(self.empty.clone()));
        }
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `data`.
        let data = unsafe { &*self.data.get() };
        locate_name(data, name).ok().map(|idx| AtomRef::new(data.by_name[idx].clone()))
    }

    /// Looks up an atom by its precomputed hash. If more than one atom
    /// shares `hash` (a collision), any one of them may be returned;
    /// callers that care about exact identity should use [`Self::find`].
    #[must_use]
    pub fn find_by_hash(&self, hash: u32) -> Option<AtomRef> {
        if hash == 0 {
            return Some(AtomRef::new(self.empty.clone()));
        }
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `data`.
        let data = unsafe { &*self.data.get() };
        let range = hash_range(data, hash);
        data.by_hash.get(range.start).map(|atom| AtomRef::new(atom.clone()))
    }

    /// Moves `atom` into the static-keep list, so it is never removed from
    /// the indexes regardless of its external refcount.
    pub fn mark_static(&self, atom: &AtomRef) {
        let rc = atom.inner.clone().expect("AtomRef used after drop");
        if rc.is_empty() {
            return; // the canonical empty atom is already permanent.
        }
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `data`.
        let data = unsafe { &mut *self.data.get() };
        if !data.static_keep.iter().any(|a| Rc::ptr_eq(a, &rc)) {
            data.static_keep.push(rc);
        }
    }

    /// Writes every interned atom, first ordered by name, then ordered by
    /// hash.
    pub fn debug_dump(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `data`.
        let data = unsafe { &*self.data.get() };
        writeln!(w, "atoms by name:")?;
        for atom in &data.by_name {
            writeln!(w, "  {:?} hash={:#010x} refs={}", atom.as_str(), atom.hash(), atom.strong_count())?;
        }
        writeln!(w, "atoms by hash:")?;
        for atom in &data.by_hash {
            writeln!(w, "  {:#010x} {:?} refs={}", atom.hash(), atom.as_str(), atom.strong_count())?;
        }
        Ok(())
    }

    /// Called from [`AtomRef::drop`]. Drops the caller's reference and, if
    /// that brought the count down to exactly what the manager itself
    /// still holds (and the atom is not static), removes it from both
    /// indexes — which drops the manager's own two references and, in
    /// turn, frees the atom.
    fn release(&self, atom: Rc<Atom>) {
        if atom.is_empty() {
            drop(atom);
            return;
        }
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `data`.
        let data = unsafe { &mut *self.data.get() };
        let is_static = data.static_keep.iter().any(|a| Rc::ptr_eq(a, &atom));
        let count_before_this_release = atom.strong_count();
        let name_snapshot = atom.as_str().to_owned();
        let hash_snapshot = atom.hash();
        drop(atom);

        if is_static {
            return;
        }
        const INDEX_BASELINE: u32 = 2; // name index + hash index
        if count_before_this_release == INDEX_BASELINE + 1 {
            if let Ok(idx) = locate_name(data, &name_snapshot) {
                data.by_name.remove(idx);
            }
            remove_from_hash_index(data, hash_snapshot, &name_snapshot);
        }
    }
}

fn locate_name(data: &Indexes, name: &str) -> Result<usize, usize> {
    data.by_name.binary_search_by(|a| a.as_str().to_ascii_lowercase().cmp(&name.to_ascii_lowercase()))
}

fn hash_range(data: &Indexes, hash: u32) -> std::ops::Range<usize> {
    let start = data.by_hash.partition_point(|a| a.hash() < hash);
    let end = data.by_hash.partition_point(|a| a.hash() <= hash);
    start..end
}

fn remove_from_hash_index(data: &mut Indexes, hash: u32, name: &str) {
    let range = hash_range(data, hash);
    if let Some(offset) = data.by_hash[range.clone()].iter().position(|a| a.eq_ignore_case(name)) {
        data.by_hash.remove(range.start + offset);
    }
}

/// An acquired reference to an interned [`Atom`]. Dropping it returns the
/// reference to the table, which removes the atom once no external holder
/// remains (unless it has been marked static).
pub struct AtomRef {
    inner: Option<Rc<Atom>>,
}

impl AtomRef {
    fn new(inner: Rc<Atom>) -> Self { Self { inner: Some(inner) } }
}

impl Deref for AtomRef {
    type Target = Atom;

    fn deref(&self) -> &Atom { self.inner.as_ref().expect("AtomRef used after drop") }
}

impl Clone for AtomRef {
    fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl Drop for AtomRef {
    fn drop(&mut self) {
        if let Some(rc) = self.inner.take() {
            AtomTable::global().release(rc);
        }
    }
}

impl fmt::Debug for AtomRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(&**self, f) }
}

impl fmt::Display for AtomRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&**self, f) }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // `AtomTable::global()` is one process-wide singleton; serialize tests
    // that touch it so they don't observe each other's atoms.
    static TEST_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn find_or_create_reuses_an_existing_atom_case_insensitively() {
        let _guard = TEST_GUARD.lock().unwrap();
        let a = AtomTable::global().find_or_create("Widget");
        let b = AtomTable::global().find_or_create("WIDGET");
        assert_eq!(a.as_str(), "Widget", "first caller's case is preserved");
        assert_eq!(a.hash(), b.hash());
        assert!(Rc::ptr_eq(a.inner.as_ref().unwrap(), b.inner.as_ref().unwrap()));
    }

    #[test]
    fn find_without_create_does_not_allocate() {
        let _guard = TEST_GUARD.lock().unwrap();
        assert!(AtomTable::global().find("NoSuchAtomXYZ").is_none());
        let created = AtomTable::global().find_or_create("Gadget");
        let found = AtomTable::global().find("gadget").expect("case-insensitive lookup");
        assert!(Rc::ptr_eq(created.inner.as_ref().unwrap(), found.inner.as_ref().unwrap()));
    }

    #[test]
    fn find_by_hash_locates_the_same_atom() {
        let _guard = TEST_GUARD.lock().unwrap();
        let created = AtomTable::global().find_or_create("Thingamajig");
        let by_hash = AtomTable::global().find_by_hash(created.hash()).expect("hash lookup");
        assert_eq!(by_hash.as_str(), "Thingamajig");
    }

    #[test]
    fn empty_name_returns_the_canonical_empty_atom_without_touching_the_table() {
        let _guard = TEST_GUARD.lock().unwrap();
        let a = AtomTable::global().find_or_create("");
        let b = AtomTable::global().find_or_create("");
        assert_eq!(a.hash(), 0);
        assert!(Rc::ptr_eq(a.inner.as_ref().unwrap(), b.inner.as_ref().unwrap()));
    }

    #[test]
    fn atom_is_removed_from_both_indexes_once_the_last_external_reference_drops() {
        let _guard = TEST_GUARD.lock().unwrap();
        let name = "TransientAtomForRemovalTest";
        let atom = AtomTable::global().find_or_create(name);
        let hash = atom.hash();
        drop(atom);
        assert!(AtomTable::global().find(name).is_none());
        assert!(AtomTable::global().find_by_hash(hash).is_none());
    }

    #[test]
    fn marking_an_atom_static_keeps_it_alive_past_zero_external_refs() {
        let _guard = TEST_GUARD.lock().unwrap();
        let name = "PermanentAtomForStaticTest";
        let atom = AtomTable::global().find_or_create(name);
        AtomTable::global().mark_static(&atom);
        drop(atom);
        assert!(AtomTable::global().find(name).is_some());
    }

    #[test]
    fn debug_dump_lists_an_interned_atom_by_name_and_by_hash() {
        let _guard = TEST_GUARD.lock().unwrap();
        let _atom = AtomTable::global().find_or_create("DumpedAtom");
        let mut out = String::new();
        AtomTable::global().debug_dump(&mut out).unwrap();
        assert!(out.contains("DumpedAtom"));
        assert!(out.contains("atoms by name:"));
        assert!(out.contains("atoms by hash:"));
    }
}
