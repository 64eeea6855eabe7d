//! Intrusive reference counting: a packed atomic state, the
//! `RefCounted` trait objects implement to expose it, the `Rc` smart
//! pointer built on top, and a capability-query mechanism that replaces the
//! source's `cIUnkAgg`/`QueryInterface` delegation chain.
//!
//! The count is kept intrusive (stored inside the object, not beside it in
//! a control block) because the design calls for "pointer from raw
//! `this`" support — `Rc::from_ref` reconstructs a strong reference from a
//! plain `&T` exactly the way the source's `AddRef`-from-`this` pattern
//! does.

mod capability;
mod rc;
mod refcount;

pub use capability::{try_acquire_as, Capability, QueryCapability};
pub use rc::Rc;
pub use refcount::{RefCount, RefCounted, ReleaseOutcome};
