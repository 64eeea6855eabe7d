//! Gray Core: the single public entry point over the five component crates.
//!
//! Each submodule here is a thin re-export of one crate's public API, so
//! applications depend on `gcore` alone instead of five path dependencies.
//! Integration tests under `tests/` exercise scenarios that cross two or
//! more of these modules; each crate's own `#[cfg(test)]` modules cover its
//! own invariants in isolation.

pub mod appstate {
    //! Lifecycle phases, command-line parsing, and the ABI probe.
    pub use gcore_appstate::{is_debugger_present, AppState, AppStateError, AppStateMain, BuildSignature, CommandLine, Phase};
}

pub mod atom {
    //! Process-wide case-insensitive string interning.
    pub use gcore_atom::{case_insensitive_hash, make_sym_name, Atom, AtomRef, AtomTable};
}

pub mod hook {
    //! Inline x86/x86_64 function hooking and the page-protection manager.
    pub use gcore_hook::{build_patch, detect_chain_pattern, read_prologue, resolve_chain_target, ChainPattern, HookError, HookInfo, PageManager, PROLOGUE_LEN};

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    pub use gcore_hook::{HookEntry, HookRegistry, SwapGuard};
}

pub mod refcount {
    //! Intrusive reference counting and capability queries.
    pub use gcore_refcount::{try_acquire_as, Capability, QueryCapability, Rc, RefCount, RefCounted, ReleaseOutcome};
}

pub mod sync {
    //! Lock-count primitives: `ScopedGuard`, `ThreadLock`, `RwLock`.
    pub use gcore_sync::{current_thread_numeric_id, Lockable, LockableExt, RwLock, ScopedGuard, ThreadLock, Timeout, NULL_THREAD, READER_SENTINEL};
}
