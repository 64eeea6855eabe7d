//! Process-wide, case-insensitive string interning.
//!
//! An [`Atom`] is a heap-allocated, reference-counted string reused by every
//! caller that interns the same (case-insensitive) text. [`AtomTable`] is
//! the process-wide manager: a name-sorted index, a hash-sorted index, and
//! a static-keep list, serialized by one re-entrant lock built on
//! `gcore-sync`'s [`gcore_sync::ThreadLock`] and reference-counted via
//! `gcore-refcount`'s [`gcore_refcount::Rc`].

mod atom;
mod hash;
mod sym_name;
mod table;

pub use atom::Atom;
pub use hash::case_insensitive_hash;
pub use sym_name::make_sym_name;
pub use table::{AtomRef, AtomTable};
