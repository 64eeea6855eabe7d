use std::any::{Any, TypeId};

use crate::{Rc, RefCounted};

/// A queryable facet of a reference-counted object.
///
/// This is the idiomatic replacement for the source's `cIUnkAgg`/
/// `QueryInterface` aggregation pattern: instead of an outer
/// controlling-unknown delegating `AddRef`/`Release` across a chain of
/// interface implementations, a capability is just another `RefCounted`
/// value reachable from the object that owns it, and `Rc`'s own lifetime
/// rules make "leaking a reference on a failed query" structurally
/// impossible — a failed query never constructs an `Rc` in the first
/// place.
pub trait Capability: RefCounted + Any {}

impl<T: RefCounted + Any> Capability for T {}

/// Implemented by object types that expose one or more [`Capability`]
/// facets by type. Analogous to a `queryCapability(id)` call,
/// with the "id" folded into the Rust type system via `C: Capability`.
pub trait QueryCapability: RefCounted {
    /// Returns an acquired reference to the requested capability, or `None`
    /// if this object does not support it. Never leaks a reference: a
    /// `None` result never touched the refcount.
    fn query_capability<C: Capability>(&self) -> Option<Rc<C>>
    where
        Self: Sized;
}

/// Helper for `QueryCapability` implementers: acquires `candidate` as an
/// `Rc<C>` if `C` is exactly `candidate`'s concrete type, otherwise reports
/// no match without touching the refcount.
///
/// # Safety-by-construction
///
/// The `TypeId` comparison is the same check `Any::downcast_ref` relies on
/// internally; once it holds, `C` and `T` are the same concrete type, so
/// relabeling the already-acquired `Rc<T>` as `Rc<C>` is not a
/// type-confusing cast.
pub fn try_acquire_as<T, C>(candidate: &T) -> Option<Rc<C>>
where
    T: RefCounted + Any,
    C: Capability,
{
    if TypeId::of::<C>() == TypeId::of::<T>() {
        let acquired = unsafe { Rc::from_ref(candidate) };
        Some(unsafe { std::mem::transmute::<Rc<T>, Rc<C>>(acquired) })
    } else {
        None
    }
}
