use std::sync::atomic::{AtomicU32, Ordering};

const COUNT_MASK: u32 = 0x1FFF_FFFF; // bits 0..=28
const DEBUG_MARKED_BIT: u32 = 1 << 29;
const STATIC_BIT: u32 = 1 << 30;
const DESTRUCTING_BIT: u32 = 1 << 31;
const MAX_COUNT: u32 = COUNT_MASK;

/// What the caller should do after [`RefCount::release`] returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The count is now `n > 0`; nothing else to do.
    Remaining(u32),
    /// The count reached zero on a non-static object: the object is now in
    /// the Destructing state and the caller (normally `Rc::drop`) must run
    /// the destructor and free the memory. No further `acquire` is valid
    /// past this point.
    Destroy,
}

/// The packed refcount state: bits 0-28 are the
/// count, bit 29 is "debug-marked", bit 30 is "static-constructed" (a
/// release that would reach zero is a no-op instead), bit 31 is
/// "destructing" (no further acquire permitted).
///
/// This is kept as a literal bit-packed `AtomicU32` rather than an enum
/// alongside a separate counter: bit-for-bit parity with the source's
/// layout is the simpler choice to reason about for a direct port. See
/// DESIGN.md.
pub struct RefCount(AtomicU32);

impl Default for RefCount {
    fn default() -> Self { Self::new() }
}

impl RefCount {
    /// A live, non-static object with one outstanding reference — the state
    /// an object is in immediately after `Rc::new` constructs its first
    /// smart pointer.
    #[must_use]
    pub const fn new() -> Self { Self(AtomicU32::new(1)) }

    /// A static-lifetime object with zero outstanding *external* references.
    /// Used for objects embedded in static or stack storage whose
    /// constructor calls this instead of [`RefCount::new`]; releasing such
    /// an object to zero never destroys it.
    #[must_use]
    pub const fn new_static() -> Self { Self(AtomicU32::new(STATIC_BIT)) }

    #[must_use]
    pub fn count(&self) -> u32 { self.0.load(Ordering::Acquire) & COUNT_MASK }

    #[must_use]
    pub fn is_static(&self) -> bool { self.0.load(Ordering::Acquire) & STATIC_BIT != 0 }

    #[must_use]
    pub fn is_destructing(&self) -> bool { self.0.load(Ordering::Acquire) & DESTRUCTING_BIT != 0 }

    #[must_use]
    pub fn is_debug_marked(&self) -> bool { self.0.load(Ordering::Acquire) & DEBUG_MARKED_BIT != 0 }

    pub fn set_debug_marked(&self, marked: bool) {
        if marked {
            self.0.fetch_or(DEBUG_MARKED_BIT, Ordering::AcqRel);
        } else {
            self.0.fetch_and(!DEBUG_MARKED_BIT, Ordering::AcqRel);
        }
    }

    /// Marks the object static. Precondition: the count is currently zero
    /// (this is meant to be called once, from the constructor of a
    /// non-heap instance, before any smart pointer has acquired it).
    pub fn mark_static(&self) {
        let prev = self.0.fetch_or(STATIC_BIT, Ordering::AcqRel);
        debug_assert_eq!(
            prev & COUNT_MASK,
            0,
            "mark_static called on an object with outstanding references"
        );
    }

    /// Atomically increments the count. Precondition: not Destructing.
    pub fn acquire(&self) -> u32 {
        loop {
            let cur = self.0.load(Ordering::Acquire);
            debug_assert_eq!(cur & DESTRUCTING_BIT, 0, "acquire() on an object that is being destructed");
            let count = cur & COUNT_MASK;
            debug_assert!(count < MAX_COUNT, "refcount overflow");
            let new = (cur & !COUNT_MASK) | (count.wrapping_add(1) & COUNT_MASK);
            if self
                .0
                .compare_exchange_weak(cur, new, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return count + 1;
            }
        }
    }

    /// Atomically decrements the count. If it reaches zero on a non-static
    /// object, transitions to Destructing and returns
    /// [`ReleaseOutcome::Destroy`] — the static bit, if any, makes reaching
    /// zero a no-op (`ReleaseOutcome::Remaining(0)`).
    pub fn release(&self) -> ReleaseOutcome {
        loop {
            let cur = self.0.load(Ordering::Acquire);
            let count = cur & COUNT_MASK;
            debug_assert!(count > 0, "release() on an object with a zero refcount");
            let new_count = count.saturating_sub(1);
            let is_static = cur & STATIC_BIT != 0;

            if new_count == 0 && !is_static {
                let new = (cur & !COUNT_MASK) | DESTRUCTING_BIT;
                if self
                    .0
                    .compare_exchange_weak(cur, new, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return ReleaseOutcome::Destroy;
                }
            } else {
                let new = (cur & !COUNT_MASK) | new_count;
                if self
                    .0
                    .compare_exchange_weak(cur, new, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return ReleaseOutcome::Remaining(new_count);
                }
            }
        }
    }
}

impl gcore_sync::Lockable for RefCount {
    /// Lets callers `use gcore_sync::LockableExt` and call
    /// `ref_count.wait_unique(timeout)` to poll for "no outstanding
    /// references" — e.g. before tearing down something a `Capability`
    /// query might still be holding a reference into.
    fn lock_count(&self) -> u32 { self.count() }
}

/// Implemented by any type whose lifetime is managed by an embedded
/// [`RefCount`] and [`crate::Rc`].
pub trait RefCounted {
    fn ref_count(&self) -> &RefCount;

    /// Called once, synchronously, right after the count reaches zero on a
    /// non-static object — before the value is dropped. The default is a
    /// no-op; override it to observe destruction without taking over
    /// deallocation (`Rc::drop` always runs the real `Drop` impl
    /// afterward).
    fn on_final_release(&self) {}
}
