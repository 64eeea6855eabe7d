use std::{cell::UnsafeCell, collections::BTreeMap};

use gcore_sync::ThreadLock;
use once_cell::sync::Lazy;

use crate::{error::HookError, os};

struct PageEntry {
    size: usize,
    saved: os::RawProtection,
    refcount: u32,
}

/// Process-wide page-protection manager: tracks, per OS page, how many
/// overlapping "make writable" requests are currently in force, so two
/// independent hook installs that happen to share a page don't undo each
/// other's unprotect.
pub struct PageManager {
    lock: ThreadLock,
    pages: UnsafeCell<BTreeMap<usize, PageEntry>>,
}

// SAFETY: every access to `pages` happens while `lock` is held.
unsafe impl Sync for PageManager {}

static PAGE_MANAGER: Lazy<PageManager> = Lazy::new(PageManager::new);

impl PageManager {
    fn new() -> Self {
        Self {
            lock: ThreadLock::new(),
            pages: UnsafeCell::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn global() -> &'static PageManager { &PAGE_MANAGER }

    /// Changes protection for every OS page overlapping `[addr, addr+len)`.
    ///
    /// `protect == false` asks to make the range writable (refcounted per
    /// page); `protect == true` asks to restore, decrementing the refcount
    /// and only actually restoring once it reaches zero.
    ///
    /// # Safety
    /// `addr` must point at `len` bytes within a single live mapping whose
    /// protection this process is allowed to change.
    pub unsafe fn set_protection(&self, addr: *mut u8, len: usize, protect: bool) -> Result<(), HookError> {
        let page_size = os::page_size();
        let end = (addr as usize).saturating_add(len);
        let mut page_start = align_down(addr as usize, page_size);

        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `pages`.
        let pages = unsafe { &mut *self.pages.get() };

        while page_start < end {
            if protect {
                self.restore_one_locked(pages, page_start)?;
            } else {
                self.unprotect_one_locked(pages, page_start, page_size)?;
            }
            page_start += page_size;
        }
        Ok(())
    }

    unsafe fn unprotect_one_locked(
        &self,
        pages: &mut BTreeMap<usize, PageEntry>,
        page_start: usize,
        page_size: usize,
    ) -> Result<(), HookError> {
        if let Some(entry) = pages.get_mut(&page_start) {
            entry.refcount += 1;
            return Ok(());
        }
        // SAFETY: `page_start` is page-aligned and `page_size` bytes long;
        // the caller of `set_protection` guaranteed the range is mapped.
        let saved = unsafe { os::make_writable(page_start as *mut u8, page_size)? };
        pages.insert(
            page_start,
            PageEntry {
                size: page_size,
                saved,
                refcount: 1,
            },
        );
        Ok(())
    }

    unsafe fn restore_one_locked(&self, pages: &mut BTreeMap<usize, PageEntry>, page_start: usize) -> Result<(), HookError> {
        let Some(entry) = pages.get_mut(&page_start) else {
            log::warn!("page manager: restore requested for untracked page {page_start:#x}");
            return Ok(());
        };
        entry.refcount -= 1;
        if entry.refcount == 0 {
            let entry = pages.remove(&page_start).unwrap_or_else(|| unreachable!());
            // SAFETY: `page_start` was made writable by a prior call in this
            // module with exactly `entry.size` and `entry.saved` recorded.
            unsafe { os::restore(page_start as *mut u8, entry.size, entry.saved)? };
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked_page_count(&self) -> usize {
        let _guard = self.lock.lock();
        // SAFETY: `_guard` serializes every access to `pages`.
        unsafe { &*self.pages.get() }.len()
    }
}

fn align_down(addr: usize, align: usize) -> usize { addr & !(align - 1) }
