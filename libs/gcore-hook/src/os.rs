//! Thin per-OS wrappers around page-size query and protection change.
//! Kept as the only `cfg(windows)`/`cfg(unix)` split in this crate, mirroring
//! how the pack's cross-platform systems crates isolate raw OS calls behind
//! a small internal module.

use crate::error::HookError;

#[cfg(windows)]
pub use windows::{make_writable, page_size, restore, RawProtection};

#[cfg(unix)]
pub use unix::{make_writable, page_size, restore, RawProtection};

#[cfg(windows)]
mod windows {
    use windows_sys::Win32::System::{
        Memory::{VirtualProtect, PAGE_EXECUTE_READWRITE},
        SystemInformation::GetSystemInfo,
    };

    use super::HookError;

    pub type RawProtection = u32;

    #[must_use]
    pub fn page_size() -> usize {
        // SAFETY: `info` is a plain-old-data struct; zero-initializing it
        // and handing GetSystemInfo a valid pointer to it is sound.
        unsafe {
            let mut info = std::mem::zeroed();
            GetSystemInfo(&mut info);
            info.dwPageSize as usize
        }
    }

    /// # Safety
    /// `addr` must point at `len` bytes that are valid to reprotect (i.e.
    /// within a live mapping).
    pub unsafe fn make_writable(addr: *mut u8, len: usize) -> Result<RawProtection, HookError> {
        let mut old = 0u32;
        if VirtualProtect(addr.cast(), len, PAGE_EXECUTE_READWRITE, &mut old) == 0 {
            Err(HookError::ProtectionFailed)
        } else {
            Ok(old)
        }
    }

    /// # Safety
    /// Same requirement as [`make_writable`]; `saved` must be a protection
    /// value this module previously returned for this exact range.
    pub unsafe fn restore(addr: *mut u8, len: usize, saved: RawProtection) -> Result<(), HookError> {
        let mut old = 0u32;
        if VirtualProtect(addr.cast(), len, saved, &mut old) == 0 {
            Err(HookError::ProtectionFailed)
        } else {
            Ok(())
        }
    }
}

#[cfg(unix)]
mod unix {
    use super::HookError;

    pub type RawProtection = libc::c_int;

    #[must_use]
    pub fn page_size() -> usize {
        // SAFETY: sysconf with a valid name is always sound.
        let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if n > 0 { n as usize } else { 4096 }
    }

    /// # Safety
    /// `addr` must point at `len` bytes within a live mapping.
    ///
    /// `mprotect` has no way to query the protection flags it is
    /// overwriting, so the "saved" value handed back is the ordinary
    /// read+execute protection a code page carries, not an actual read of
    /// prior state (see DESIGN.md: an accurate query would need to parse
    /// `/proc/self/maps`, which this rewrite does not do).
    pub unsafe fn make_writable(addr: *mut u8, len: usize) -> Result<RawProtection, HookError> {
        let prot = libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC;
        if libc::mprotect(addr.cast(), len, prot) == 0 {
            Ok(libc::PROT_READ | libc::PROT_EXEC)
        } else {
            Err(HookError::ProtectionFailed)
        }
    }

    /// # Safety
    /// Same requirement as [`make_writable`].
    pub unsafe fn restore(addr: *mut u8, len: usize, saved: RawProtection) -> Result<(), HookError> {
        if libc::mprotect(addr.cast(), len, saved) == 0 {
            Ok(())
        } else {
            Err(HookError::ProtectionFailed)
        }
    }
}
