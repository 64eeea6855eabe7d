use std::cell::UnsafeCell;

use gcore_sync::ThreadLock;

use crate::{
    error::HookError,
    page::PageManager,
    prologue::{build_patch, detect_chain_pattern, read_prologue, resolve_chain_target, ChainPattern, PROLOGUE_LEN},
};

const PATCH_LEN: usize = 5;
/// Bounds how many chainable thunks `install` will follow before giving up
/// on finding the "ultimate destination" — a defensive cap against a
/// pathological chain of thunks pointing at each other.
const MAX_CHAIN_HOPS: usize = 8;

struct HookState {
    site: *mut u8,
    saved_prologue: [u8; PROLOGUE_LEN],
    patch: [u8; PATCH_LEN],
    chain_pattern: Option<ChainPattern>,
    installed: bool,
}

/// One inline hook site: an original function pointer, its saved prologue,
/// and the five-byte JMP patch that redirects it — x86/x86_64 only.
pub struct HookEntry {
    lock: ThreadLock,
    state: UnsafeCell<HookState>,
}

// SAFETY: every access to `state` happens while `lock` is held.
unsafe impl Sync for HookEntry {}
unsafe impl Send for HookEntry {}

impl HookEntry {
    /// Creates an uninstalled hook targeting `original`.
    ///
    /// # Safety
    /// `original` must point at at least [`PROLOGUE_LEN`] readable,
    /// executable bytes that remain valid for the hook's lifetime.
    #[must_use]
    pub unsafe fn new(original: *mut u8) -> Self {
        Self {
            lock: ThreadLock::new(),
            state: UnsafeCell::new(HookState {
                site: original,
                saved_prologue: [0; PROLOGUE_LEN],
                patch: [0; PATCH_LEN],
                chain_pattern: None,
                installed: false,
            }),
        }
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `state`.
        unsafe { &*self.state.get() }.installed
    }

    /// Installs the hook, redirecting `original` to `replacement`.
    ///
    /// If `skip_chain` is set and the original prologue is itself a
    /// chainable thunk, the hook is installed at the chain's ultimate
    /// destination instead.
    ///
    /// # Safety
    /// `replacement` must be a valid function pointer with a compatible
    /// calling convention for whatever was originally at the hook site, and
    /// the hook site must not be concurrently executing while the patch
    /// bytes are written.
    pub unsafe fn install(&self, replacement: *mut u8, skip_chain: bool) -> Result<(), HookError> {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `state`.
        let state = unsafe { &mut *self.state.get() };
        if state.installed {
            return Err(HookError::AlreadyInstalled);
        }

        // SAFETY: `replacement` is required by this function's own safety
        // contract to point at valid code.
        let replacement_prologue = unsafe { read_prologue(replacement) };
        if detect_chain_pattern(&replacement_prologue).is_some() {
            return Err(HookError::ReplacementNotChainable);
        }

        let mut site = state.site;
        let mut chain_pattern = None;
        if skip_chain {
            for _ in 0..MAX_CHAIN_HOPS {
                // SAFETY: `site` is required to point at valid code, either
                // the original target or a chain hop resolved from it below.
                let prologue = unsafe { read_prologue(site) };
                match detect_chain_pattern(&prologue) {
                    Some(pattern) => {
                        // SAFETY: the pattern was just recognized in live
                        // code at `site`.
                        site = unsafe { resolve_chain_target(site, pattern) }.cast_mut();
                        chain_pattern = Some(pattern);
                    },
                    None => break,
                }
            }
        }

        // SAFETY: `site` points at valid code (either the original target
        // or a chain hop resolved from it above).
        let saved_prologue = unsafe { read_prologue(site) };
        let patch = build_patch(site, replacement).ok_or(HookError::DisplacementTooLarge)?;
        if patch == saved_prologue[..PATCH_LEN] {
            return Err(HookError::DuplicateHook);
        }

        // SAFETY: `site` points at `PATCH_LEN` bytes within the live
        // mapping backing the hook's target code.
        unsafe {
            PageManager::global().set_protection(site, PATCH_LEN, false)?;
            std::ptr::copy_nonoverlapping(patch.as_ptr(), site, PATCH_LEN);
            PageManager::global().set_protection(site, PATCH_LEN, true)?;
        }

        state.site = site;
        state.saved_prologue = saved_prologue;
        state.patch = patch;
        state.chain_pattern = chain_pattern;
        state.installed = true;
        Ok(())
    }

    /// Restores the saved prologue and clears the installed flag.
    pub fn remove(&self) -> Result<(), HookError> {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `state`.
        let state = unsafe { &mut *self.state.get() };
        if !state.installed {
            return Err(HookError::NotInstalled);
        }
        // SAFETY: `state.site` was validated and patched by a prior
        // `install` call; restoring the bytes it saved is always sound.
        unsafe {
            PageManager::global().set_protection(state.site, PATCH_LEN, false)?;
            std::ptr::copy_nonoverlapping(state.saved_prologue.as_ptr(), state.site, PATCH_LEN);
            PageManager::global().set_protection(state.site, PATCH_LEN, true)?;
        }
        state.installed = false;
        Ok(())
    }

    /// Returns a pointer callable as the original, unhooked code. If the
    /// original prologue was itself chainable, this is the chain's ultimate
    /// destination (no un-patching needed to call it). Otherwise it is the
    /// hook site itself, and callers must hold a [`SwapGuard`] while calling
    /// through it.
    #[must_use]
    pub fn chain_func(&self) -> *mut u8 {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `state`.
        unsafe { &*self.state.get() }.site
    }

    #[must_use]
    pub fn chained_via_pattern(&self) -> bool {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `state`.
        unsafe { &*self.state.get() }.chain_pattern.is_some()
    }

    /// Temporarily restores the saved prologue for the duration of the
    /// guard, re-patching on drop. A no-op pair if the hook resolved to a
    /// chain target (no un-patching is needed to call it directly).
    #[must_use]
    pub fn swap(&self) -> SwapGuard<'_> {
        let needs_swap = !self.chained_via_pattern() && self.is_installed();
        if needs_swap {
            let _guard = self.lock.lock();
            // SAFETY: `_guard` serializes every access to `state`.
            let state = unsafe { &*self.state.get() };
            // SAFETY: `state.site` holds `PATCH_LEN` live, writable bytes
            // whenever `installed` is true.
            unsafe {
                std::ptr::copy_nonoverlapping(state.saved_prologue.as_ptr(), state.site, PATCH_LEN);
            }
        }
        SwapGuard {
            entry: self,
            swapped: needs_swap,
        }
    }
}

/// RAII guard returned by [`HookEntry::swap`]: re-applies the patch bytes
/// on drop if it removed them on construction.
#[must_use]
pub struct SwapGuard<'a> {
    entry: &'a HookEntry,
    swapped: bool,
}

impl Drop for SwapGuard<'_> {
    fn drop(&mut self) {
        if self.swapped {
            let _guard = self.entry.lock.lock();
            // SAFETY: `_guard` serializes every access to `state`.
            let state = unsafe { &*self.entry.state.get() };
            // SAFETY: same as in `HookEntry::swap`.
            unsafe {
                std::ptr::copy_nonoverlapping(state.patch.as_ptr(), state.site, PATCH_LEN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A hand-rolled function prologue long enough to host a 5-byte patch,
    // backed by executable... no, by ordinary memory: these tests exercise
    // the bookkeeping (state transitions, chain detection wiring) without
    // actually redirecting control flow, since that requires genuinely
    // executable pages this test harness does not set up.
    fn scratch_site() -> Box<[u8; PROLOGUE_LEN]> { Box::new([0x90; PROLOGUE_LEN]) } // NOP sled

    #[test]
    fn install_then_remove_round_trips_the_saved_prologue() {
        let mut site = scratch_site();
        let mut replacement = scratch_site();
        replacement[0] = 0xC3; // ret, definitely not chainable
        let original_bytes = *site;

        // SAFETY: `site`/`replacement` are real, live, page-backed buffers
        // for the duration of this test.
        unsafe {
            let entry = HookEntry::new(site.as_mut_ptr());
            entry.install(replacement.as_mut_ptr(), false).unwrap();
            assert!(entry.is_installed());
            assert_ne!(*site, original_bytes, "the patch bytes must have been written");

            entry.remove().unwrap();
            assert!(!entry.is_installed());
            assert_eq!(*site, original_bytes, "remove must restore the exact original bytes");
        }
    }

    #[test]
    fn installing_twice_fails_without_touching_memory_again() {
        let mut site = scratch_site();
        let mut replacement = scratch_site();
        replacement[0] = 0xC3;

        // SAFETY: see above.
        unsafe {
            let entry = HookEntry::new(site.as_mut_ptr());
            entry.install(replacement.as_mut_ptr(), false).unwrap();
            assert_eq!(entry.install(replacement.as_mut_ptr(), false), Err(HookError::AlreadyInstalled));
        }
    }

    #[test]
    fn refuses_a_replacement_with_a_chainable_prologue() {
        let mut site = scratch_site();
        let mut replacement = scratch_site();
        replacement[0] = 0xE9; // looks like a near JMP

        // SAFETY: see above.
        unsafe {
            let entry = HookEntry::new(site.as_mut_ptr());
            assert_eq!(
                entry.install(replacement.as_mut_ptr(), false),
                Err(HookError::ReplacementNotChainable)
            );
        }
    }
}
