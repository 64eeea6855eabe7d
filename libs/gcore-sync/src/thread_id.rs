use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    thread::ThreadId,
};

use once_cell::sync::Lazy;

/// The sentinel stored in a [`crate::ThreadLock`]'s owner field when no
/// thread holds it.
pub const NULL_THREAD: u64 = 0;

/// The pseudo-thread-id a [`crate::RwLock`] installs as owner while one or
/// more readers hold the shared lock. Reserved by
/// registering it before any real thread is assigned an id, so no live
/// thread can ever collide with it.
pub const READER_SENTINEL: u64 = 1;

static NEXT_ID: AtomicU64 = AtomicU64::new(2);
static REGISTRY: Lazy<Mutex<HashMap<ThreadId, u64>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// A process-wide numeric id for the calling thread, stable for the thread's
/// lifetime.
///
/// `std::thread::ThreadId` has no stable conversion to an integer, but
/// `ThreadLock`'s owner field needs one for atomic compare-exchange. This
/// registry hands out monotonically increasing ids starting at `2` (`0` and
/// `1` are reserved for [`NULL_THREAD`] and [`READER_SENTINEL`]).
#[must_use]
pub fn current_thread_numeric_id() -> u64 {
    let tid = std::thread::current().id();
    let mut registry = REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    *registry
        .entry(tid)
        .or_insert_with(|| NEXT_ID.fetch_add(1, Ordering::Relaxed))
}
