use std::{fmt, ops::Deref, ptr::NonNull};

use crate::refcount::{RefCounted, ReleaseOutcome};

/// An intrusively reference-counted smart pointer.
///
/// Cloning acquires, dropping releases; on drop, if the release brings the
/// count to zero on a non-static object, the pointee's [`RefCounted::on_final_release`]
/// hook runs and the heap allocation is freed. Rust's ownership model
/// already gives move semantics "for free" — a moved-from `Rc` simply no
/// longer exists as a value the compiler will let you touch, which is the
/// safe-Rust equivalent of "move leaves the source pointer null
/// without touching refcount" (there is no separate null state to model).
pub struct Rc<T: RefCounted + ?Sized> {
    ptr: NonNull<T>,
}

impl<T: RefCounted> Rc<T> {
    /// Allocates `value` on the heap with one outstanding reference.
    #[must_use]
    pub fn new(value: T) -> Self {
        let boxed = Box::new(value);
        Self {
            // Box::into_raw never returns null.
            ptr: NonNull::new(Box::into_raw(boxed)).unwrap_or_else(|| unreachable!()),
        }
    }
}

impl<T: RefCounted + ?Sized> Rc<T> {
    /// Reconstructs an `Rc<T>` from a borrow into an object already owned
    /// by at least one live `Rc`, acquiring a new reference.
    ///
    /// # Safety
    ///
    /// `this` must be the object behind a currently-live `Rc<T>` allocation
    /// (i.e. reachable only through pointers this module's bookkeeping
    /// agrees with) — calling this on a stack value or on an object whose
    /// last `Rc` has already been dropped is undefined behavior. This is
    /// the "pointer from raw `this`" facility this rewrite needs to
    /// support.
    #[must_use]
    pub unsafe fn from_ref(this: &T) -> Self {
        this.ref_count().acquire();
        Self {
            ptr: NonNull::from(this),
        }
    }

    #[must_use]
    pub fn strong_count(&self) -> u32 { self.as_ref().ref_count().count() }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool { std::ptr::eq(a.ptr.as_ptr(), b.ptr.as_ptr()) }
}

impl<T: RefCounted + ?Sized> Deref for Rc<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the count being > 0 (guaranteed by Rc's own invariants)
        // keeps the allocation alive for as long as any Rc points at it.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: RefCounted + ?Sized> Clone for Rc<T> {
    fn clone(&self) -> Self {
        // Acquire the new reference before the old one can possibly be
        // released, so a concurrent release-to-zero on another Rc can
        // never race past us.
        self.ref_count().acquire();
        Self { ptr: self.ptr }
    }
}

impl<T: RefCounted + ?Sized> Drop for Rc<T> {
    fn drop(&mut self) {
        let outcome = self.ref_count().release();
        if outcome == ReleaseOutcome::Destroy {
            self.on_final_release();
            // SAFETY: we were the last strong reference (Destroy is only
            // returned once, exactly when the count transitions to zero),
            // and the pointer was always allocated via Box::into_raw.
            unsafe {
                drop(Box::from_raw(self.ptr.as_ptr()));
            }
        }
    }
}

// SAFETY: Rc's only interior mutability is the atomic RefCount, so sharing
// or sending an Rc<T> across threads is exactly as sound as sharing &T/T
// would be.
unsafe impl<T: RefCounted + ?Sized + Sync + Send> Send for Rc<T> {}
unsafe impl<T: RefCounted + ?Sized + Sync + Send> Sync for Rc<T> {}

impl<T: RefCounted + fmt::Debug + ?Sized> fmt::Debug for Rc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(&**self, f) }
}
