use std::cell::UnsafeCell;

use gcore_sync::ThreadLock;
use once_cell::sync::Lazy;

/// A diagnostic snapshot of one registered hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInfo {
    pub name: String,
    pub site: usize,
    pub installed: bool,
}

/// Process-wide enumeration of named hooks, for diagnostics only — callers
/// opt a [`crate::HookEntry`] into this registry explicitly; it plays no
/// part in install/remove correctness.
pub struct HookRegistry {
    lock: ThreadLock,
    entries: UnsafeCell<Vec<HookInfo>>,
}

// SAFETY: every access to `entries` happens while `lock` is held.
unsafe impl Sync for HookRegistry {}

static REGISTRY: Lazy<HookRegistry> = Lazy::new(HookRegistry::new);

impl HookRegistry {
    fn new() -> Self {
        Self {
            lock: ThreadLock::new(),
            entries: UnsafeCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn global() -> &'static HookRegistry { &REGISTRY }

    /// Records `name` as installed at `site`, replacing any prior entry
    /// with the same name. The registry lock is held only for this push,
    /// never across the patch itself.
    pub fn record_installed(&self, name: impl Into<String>, site: *const u8) {
        let name = name.into();
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `entries`.
        let entries = unsafe { &mut *self.entries.get() };
        entries.retain(|e| e.name != name);
        entries.push(HookInfo {
            name,
            site: site as usize,
            installed: true,
        });
    }

    /// Marks `name` removed. A no-op if `name` was never recorded.
    pub fn record_removed(&self, name: &str) {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `entries`.
        let entries = unsafe { &mut *self.entries.get() };
        if let Some(entry) = entries.iter_mut().find(|e| e.name == name) {
            entry.installed = false;
        }
    }

    /// A snapshot of every currently-installed hook.
    #[must_use]
    pub fn installed(&self) -> Vec<HookInfo> {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `entries`.
        let entries = unsafe { &*self.entries.get() };
        entries.iter().filter(|e| e.installed).cloned().collect()
    }
}
