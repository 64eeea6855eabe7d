//! Inline x86/x86_64 function hooking: relative-JMP patching with
//! chainable-thunk detection, and the page-protection manager that backs it.
//!
//! The prologue-pattern helpers ([`detect_chain_pattern`], [`build_patch`])
//! compile on any architecture; everything that actually writes to code
//! ([`HookEntry`], [`PageManager`]) is gated to `x86`/`x86_64`, since a
//! relative 5-byte JMP patch is meaningless on other instruction sets.

mod error;
mod prologue;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod hook;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod os;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod page;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod registry;

pub use error::HookError;
pub use prologue::{build_patch, detect_chain_pattern, read_prologue, resolve_chain_target, ChainPattern, PROLOGUE_LEN};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use hook::{HookEntry, SwapGuard};
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use page::PageManager;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use registry::{HookInfo, HookRegistry};
