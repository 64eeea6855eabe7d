use std::{thread, time::Instant};

use crate::Timeout;

/// The base lock-count contract. `count` never goes negative; a
/// violation is a programming error caught by `debug_assert!` in
/// implementations, never surfaced as a `Result`.
pub trait Lockable {
    /// Current lock count. `0` means unlocked.
    fn lock_count(&self) -> u32;
}

/// Blanket helpers built only on [`Lockable::lock_count`].
pub trait LockableExt: Lockable {
    /// Polls until `lock_count() == 0` or `timeout` elapses, returning
    /// whether the count reached zero.
    ///
    /// The backoff: the first check has no sleep
    /// (just a `thread::yield_now`), every subsequent check sleeps a flat
    /// 1ms. This is deliberately not exponential — the source's comment is
    /// "first retry immediate, thereafter fixed 1ms sleeps", not a backoff
    /// curve.
    fn wait_unique(&self, timeout: Timeout) -> bool {
        let now = Instant::now();
        let deadline = timeout.deadline(now);
        let mut first = true;
        loop {
            if self.lock_count() == 0 {
                return true;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return false;
                }
            }
            if first {
                thread::yield_now();
                first = false;
            } else {
                thread::sleep(std::time::Duration::from_millis(1));
            }
        }
    }
}

impl<T: Lockable + ?Sized> LockableExt for T {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct Counter(AtomicU32);
    impl Lockable for Counter {
        fn lock_count(&self) -> u32 { self.0.load(Ordering::Relaxed) }
    }

    #[test]
    fn wait_unique_returns_immediately_when_already_zero() {
        let c = Counter(AtomicU32::new(0));
        assert!(c.wait_unique(Timeout::Immediate));
    }

    #[test]
    fn wait_unique_immediate_fails_without_sleeping_when_nonzero() {
        let c = Counter(AtomicU32::new(1));
        let start = std::time::Instant::now();
        assert!(!c.wait_unique(Timeout::Immediate));
        assert!(start.elapsed() < std::time::Duration::from_millis(50));
    }

    #[test]
    fn wait_unique_succeeds_once_another_thread_clears_the_count() {
        use std::sync::Arc;
        let counter = Arc::new(Counter(AtomicU32::new(1)));
        let bg = Arc::clone(&counter);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            bg.0.store(0, Ordering::Relaxed);
        });
        assert!(counter.wait_unique(Timeout::from_millis(1000)));
        handle.join().unwrap();
    }
}
