//! A read-only, cheap query for "is a debugger attached to this process",
//! used to soften assertion logging under a debugger.

#[cfg(windows)]
pub fn is_debugger_present() -> bool {
    // SAFETY: `IsDebuggerPresent` takes no arguments and has no
    // preconditions beyond being callable, which it always is.
    unsafe { windows_sys::Win32::System::Diagnostics::Debug::IsDebuggerPresent() != 0 }
}

#[cfg(unix)]
pub fn is_debugger_present() -> bool {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return false;
    };
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse::<u32>().ok())
        .is_some_and(|pid| pid != 0)
}

#[cfg(all(not(windows), not(unix)))]
pub fn is_debugger_present() -> bool { false }
