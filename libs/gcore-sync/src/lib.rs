//! Lock-count tracking, re-entrant thread locks, and read/write locks.
//!
//! This crate is the bottom of the dependency graph: the reference-counted
//! object model (`gcore-refcount`), the atom manager (`gcore-atom`), the
//! hook engine (`gcore-hook`) and the application-state singleton
//! (`gcore-appstate`) all build their internal serialization on top of
//! [`ThreadLock`] and [`ScopedGuard`].
//!
//! The three layers mirror the source library's `CLockableX` /
//! `CThreadLockableX` / `CThreadLockRWX` hierarchy:
//!
//! - [`Lockable`] is the bare lock-count contract.
//! - [`ThreadLock`] adds owner-thread tracking and re-entrant acquisition.
//! - [`RwLock`] adds shared-read / exclusive-write semantics on top of a
//!   [`ThreadLock`] plus an auxiliary one.

mod guard;
mod lockable;
mod rwlock;
mod thread_id;
mod thread_lock;
mod timeout;

pub use guard::ScopedGuard;
pub use lockable::{Lockable, LockableExt};
pub use rwlock::RwLock;
pub use thread_id::{current_thread_numeric_id, NULL_THREAD, READER_SENTINEL};
pub use thread_lock::ThreadLock;
pub use timeout::Timeout;
