use std::sync::{
    atomic::{AtomicBool, Ordering},
    Once,
};

static EXITED_NORMALLY: AtomicBool = AtomicBool::new(false);
static REGISTER: Once = Once::new();

/// Registers an `atexit` hook (once per process) that logs if the process
/// exits without having gone through [`crate::AppState::abort_app`] or an
/// [`crate::AppStateMain`] drop — catching third-party code that calls
/// `exit`/`ExitProcess` directly.
pub(crate) fn ensure_registered() {
    REGISTER.call_once(|| {
        // SAFETY: `on_exit` is `extern "C"`, takes no arguments, and never
        // unwinds; registering it is always sound.
        unsafe { libc::atexit(on_exit) };
    });
}

pub(crate) fn mark_normal_exit() { EXITED_NORMALLY.store(true, Ordering::SeqCst); }

extern "C" fn on_exit() {
    if !EXITED_NORMALLY.load(Ordering::SeqCst) {
        log::warn!("process exit() called before the normal phase transition to Exit; a third-party library likely called exit() directly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_normal_exit_flips_the_flag() {
        mark_normal_exit();
        assert!(EXITED_NORMALLY.load(Ordering::SeqCst));
    }
}
