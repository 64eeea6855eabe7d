/// A move-only RAII value that releases a lock on drop.
///
/// Constructing an inert guard (via [`ScopedGuard::inert`]) maps to the
/// source's "constructed from `(null, false)`" case — `try_lock` failing
/// returns one of these so callers can test `is_inert()` without the lock
/// ever having been touched. Constructing via [`ScopedGuard::new`] maps to
/// "constructed from `(this, true)`" — the guard now owns the release
/// responsibility and will call it exactly once, on drop, from whichever
/// scope it ends up in after being moved.
#[must_use = "a ScopedGuard releases its lock when dropped; binding it to `_` drops it immediately"]
pub struct ScopedGuard<'a> {
    release: Option<Box<dyn FnMut() + 'a>>,
}

impl<'a> ScopedGuard<'a> {
    /// A guard that owns nothing and releases nothing on drop.
    pub fn inert() -> Self { Self { release: None } }

    /// A guard that calls `release` exactly once when it is dropped.
    pub fn new(release: impl FnMut() + 'a) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// True for a guard produced by a failed `try_lock`.
    #[must_use]
    pub fn is_inert(&self) -> bool { self.release.is_none() }
}

impl Drop for ScopedGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut release) = self.release.take() {
            release();
        }
    }
}
