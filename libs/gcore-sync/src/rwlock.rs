use std::time::Instant;

use crate::{
    thread_id::{current_thread_numeric_id, READER_SENTINEL},
    ScopedGuard, ThreadLock, Timeout,
};

/// Shared-read / exclusive-write lock built on two [`ThreadLock`]s.
///
/// `main` carries the write-lock semantics directly (owner == writer's
/// thread id, count == write re-entry depth) and, for readers, owner ==
/// [`crate::READER_SENTINEL`] with count == reader count. `aux` serializes
/// only the reader owner-transition; it is never held across user code.
pub struct RwLock {
    main: ThreadLock,
    aux: ThreadLock,
}

impl Default for RwLock {
    fn default() -> Self { Self::new() }
}

impl RwLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            main: ThreadLock::new(),
            aux: ThreadLock::new(),
        }
    }

    /// Exclusive write lock. Re-entrant on the same thread.
    pub fn write_lock(&self) -> ScopedGuard<'_> { self.try_write_lock(Timeout::Infinite) }

    pub fn try_write_lock(&self, timeout: Timeout) -> ScopedGuard<'_> {
        let tid = current_thread_numeric_id();
        if self.main.acquire_as(tid, timeout) {
            ScopedGuard::new(move || self.write_unlock())
        } else {
            ScopedGuard::inert()
        }
    }

    /// Shared read lock. A thread that already holds the write lock gets an
    /// extra write-lock count instead of a real shared slot (downgrade
    /// case).
    pub fn read_lock(&self) -> ScopedGuard<'_> { self.try_read_lock(Timeout::Infinite) }

    pub fn try_read_lock(&self, timeout: Timeout) -> ScopedGuard<'_> {
        let tid = current_thread_numeric_id();
        if self.main.current_owner() == tid {
            self.main.inc_raw();
            return ScopedGuard::new(move || self.write_unlock());
        }

        // The aux lock is held across the owner-transition wait itself: a
        // reader that is waiting for a writer to release genuinely blocks
        // other readers from entering. Both waits share `timeout`'s budget
        // rather than each getting the full amount, so a bounded
        // `try_read_lock` can't block past its deadline under aux contention.
        let start = Instant::now();
        let aux_guard = self.aux.try_lock(timeout);
        if aux_guard.is_inert() {
            return ScopedGuard::inert();
        }
        let remaining = timeout.remaining_after(start.elapsed());
        if self.main.acquire_as(READER_SENTINEL, remaining) {
            drop(aux_guard);
            ScopedGuard::new(move || self.read_unlock())
        } else {
            drop(aux_guard);
            ScopedGuard::inert()
        }
    }

    fn write_unlock(&self) {
        // Mirrors ThreadLock::unlock's bookkeeping; duplicated here because
        // `main` is private and the downgrade path needs to share the same
        // release as a genuine writer release.
        debug_assert_eq!(self.main.current_owner(), current_thread_numeric_id());
        let prev = self.main.dec_raw();
        debug_assert!(prev > 0, "RwLock write-unlocked more times than locked");
        if prev == 1 {
            self.main.clear_owner_raw();
        }
    }

    fn read_unlock(&self) {
        let _aux_guard = self.aux.lock();
        let prev = self.main.dec_raw();
        debug_assert!(prev > 0, "RwLock read-unlocked more times than locked");
        if prev == 1 {
            self.main.clear_owner_raw();
        }
    }

    /// Current reader/writer depth, for tests and diagnostics.
    #[must_use]
    pub fn lock_count(&self) -> u32 {
        use crate::Lockable as _;
        self.main.lock_count()
    }
}
