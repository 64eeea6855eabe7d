use std::{
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
    time::Instant,
};

use crate::{
    thread_id::{current_thread_numeric_id, NULL_THREAD},
    Lockable, ScopedGuard, Timeout,
};

/// A re-entrant thread lock: [`Lockable`] plus an owner-thread id.
///
/// Same-thread re-entry increments the count; only the owner thread may
/// increment further or release. Acquisition polls a compare-exchange on the
/// owner field rather than blocking on a native futex/keyed-event — a
/// spin/poll fast path is worth keeping for the specialized, short-held-lock
/// cases a generic re-entrant owner-tracked lock is built for.
pub struct ThreadLock {
    owner: AtomicU64,
    count: AtomicU32,
}

impl Default for ThreadLock {
    fn default() -> Self { Self::new() }
}

impl ThreadLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner: AtomicU64::new(NULL_THREAD),
            count: AtomicU32::new(0),
        }
    }

    /// Blocks until the calling thread acquires the lock.
    pub fn lock(&self) -> ScopedGuard<'_> {
        let guard = self.try_lock(Timeout::Infinite);
        debug_assert!(!guard.is_inert(), "ThreadLock::lock must not fail with an infinite timeout");
        guard
    }

    /// Acquires the lock, giving up after `timeout`. Returns an inert guard
    /// on failure.
    pub fn try_lock(&self, timeout: Timeout) -> ScopedGuard<'_> {
        let tid = current_thread_numeric_id();
        if self.acquire_as(tid, timeout) {
            ScopedGuard::new(move || self.unlock())
        } else {
            ScopedGuard::inert()
        }
    }

    /// Releases one level of ownership. Must be called on the thread that
    /// owns the lock; violating this is a programming error (debug-checked,
    /// best-effort in release).
    fn unlock(&self) {
        let tid = current_thread_numeric_id();
        debug_assert_eq!(
            self.owner.load(Ordering::Acquire),
            tid,
            "ThreadLock unlocked by a thread other than its owner"
        );
        let prev = self.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "ThreadLock unlocked more times than it was locked");
        if prev == 1 {
            self.owner.store(NULL_THREAD, Ordering::Release);
        }
    }

    /// Emergency recovery: clears the owner field only if it still matches
    /// `expected`. For use only after confirming the owning thread is dead;
    /// not a normal unlock path.
    pub fn clear_owner(&self, expected: u64) -> bool {
        self.owner
            .compare_exchange(expected, NULL_THREAD, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// The CAS-and-poll loop shared by `lock`/`try_lock` and, with
    /// `id == READER_SENTINEL`, by [`crate::RwLock`]'s reader path.
    pub(crate) fn acquire_as(&self, id: u64, timeout: Timeout) -> bool {
        let now = Instant::now();
        let deadline = timeout.deadline(now);
        let mut first = true;
        loop {
            match self
                .owner
                .compare_exchange(NULL_THREAD, id, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.count.fetch_add(1, Ordering::AcqRel);
                    return true;
                },
                Err(actual) if actual == id => {
                    self.count.fetch_add(1, Ordering::AcqRel);
                    return true;
                },
                Err(_) => {
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            return false;
                        }
                    }
                    if first {
                        std::thread::yield_now();
                        first = false;
                    } else {
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                },
            }
        }
    }

    pub(crate) fn current_owner(&self) -> u64 { self.owner.load(Ordering::Acquire) }

    pub(crate) fn inc_raw(&self) { self.count.fetch_add(1, Ordering::AcqRel); }

    /// Decrements the raw count without touching the owner field; returns
    /// the count observed before the decrement.
    pub(crate) fn dec_raw(&self) -> u32 { self.count.fetch_sub(1, Ordering::AcqRel) }

    pub(crate) fn clear_owner_raw(&self) { self.owner.store(NULL_THREAD, Ordering::Release); }
}

impl Lockable for ThreadLock {
    fn lock_count(&self) -> u32 { self.count.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn reentrant_lock_increments_count_on_the_owning_thread() {
        let lock = ThreadLock::new();
        let g1 = lock.lock();
        assert_eq!(lock.lock_count(), 1);
        let g2 = lock.lock();
        assert_eq!(lock.lock_count(), 2);
        drop(g2);
        assert_eq!(lock.lock_count(), 1);
        drop(g1);
        assert_eq!(lock.lock_count(), 0);
    }

    #[test]
    fn try_lock_zero_fails_immediately_without_sleeping_when_contended() {
        let lock = Arc::new(ThreadLock::new());
        let _held = lock.lock();
        let contender = Arc::clone(&lock);
        let start = Instant::now();
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let guard = contender.try_lock(Timeout::Immediate);
            tx.send(guard.is_inert()).unwrap();
        });
        assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap());
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn scenario_two_re_entrant_threads_handoff() {
        // Mirrors a two-thread handoff under contention.
        let lock = Arc::new(ThreadLock::new());
        let g1 = lock.lock();
        let g2 = lock.lock();
        assert_eq!(lock.lock_count(), 2);

        let other = Arc::clone(&lock);
        let (tx, rx) = std::sync::mpsc::channel();
        let t2 = thread::spawn(move || {
            let guard = other.try_lock(Timeout::from_millis(200));
            tx.send(guard.is_inert()).unwrap();
            // hold the receiving side open until the main thread says so
            drop(guard);
        });
        assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), "T2 must fail while T1 holds the lock");
        t2.join().unwrap();

        drop(g1);
        drop(g2);
        assert_eq!(lock.lock_count(), 0);

        let other = Arc::clone(&lock);
        let t3 = thread::spawn(move || {
            let guard = other.lock();
            assert_eq!(other.lock_count(), 1);
            drop(guard);
        });
        t3.join().unwrap();
        assert_eq!(lock.lock_count(), 0);
    }

    #[test]
    #[allow(clippy::mem_forget)] // deliberately simulates a thread that dies lock-in-hand
    fn clear_owner_recovers_after_a_simulated_dead_thread() {
        let lock = Arc::new(ThreadLock::new());
        let holder = Arc::clone(&lock);
        let tid = thread::spawn(move || {
            std::mem::forget(holder.lock());
            current_thread_numeric_id()
        })
        .join()
        .unwrap();

        assert_eq!(lock.lock_count(), 1);
        assert!(lock.clear_owner(tid));
        assert!(!lock.try_lock(Timeout::Immediate).is_inert());
    }
}
