use std::{
    cell::Cell,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
};

use gcore_sync::current_thread_numeric_id;
use once_cell::sync::{Lazy, OnceCell};

use crate::{
    abi_probe::{self, BuildSignature},
    command_line::CommandLine,
    debugger, error::AppStateError, exit_catcher,
    paths,
    phase::Phase,
};

/// Bumped whenever a change to this struct's layout would make two copies
/// of this library incompatible in the same process.
const LIBRARY_VERSION: u32 = 1;

thread_local! {
    static LOADING_LIBRARY: Cell<bool> = const { Cell::new(false) };
}

static SINGLETON: Lazy<AppState> = Lazy::new(AppState::construct);
static PROBE_ONCE: std::sync::Once = std::sync::Once::new();

/// Process-wide application state: lifecycle phase, command line, the
/// ABI-mismatch probe, and a handful of cached OS queries.
///
/// Read-mostly after [`AppStateMain`] runs; the only field mutated with any
/// frequency is [`Phase`], which one thread (the one running `main`)
/// transitions while every other thread only reads it.
pub struct AppState {
    phase: AtomicU8,
    main_thread_id: u64,
    abi_mismatch: AtomicBool,
    command_line: OnceCell<CommandLine>,
    temp_dir: OnceCell<PathBuf>,
    user_name: OnceCell<String>,
    user_home: OnceCell<PathBuf>,
    exe_path: OnceCell<PathBuf>,
}

impl AppState {
    fn construct() -> Self {
        exit_catcher::ensure_registered();
        Self {
            phase: AtomicU8::new(Phase::PreInit as u8),
            main_thread_id: current_thread_numeric_id(),
            abi_mismatch: AtomicBool::new(false),
            command_line: OnceCell::new(),
            temp_dir: OnceCell::new(),
            user_name: OnceCell::new(),
            user_home: OnceCell::new(),
            exe_path: OnceCell::new(),
        }
    }

    /// `(library version, size_of::<AppState>())`, embedded in the ABI
    /// probe's environment variable name.
    #[must_use]
    pub fn build_signature() -> BuildSignature { (LIBRARY_VERSION, std::mem::size_of::<AppState>()) }

    /// The process-wide singleton. Constructed lazily on first access (the
    /// closest a safe Rust rewrite gets to "before `main`"); the ABI probe
    /// runs exactly once, on the first call from any thread.
    #[must_use]
    pub fn global() -> &'static AppState {
        let state = &*SINGLETON;
        PROBE_ONCE.call_once(|| {
            let addr = state as *const AppState as usize;
            if abi_probe::probe_and_register(Self::build_signature(), addr).is_err() {
                state.abi_mismatch.store(true, Ordering::SeqCst);
                log::error!("a second copy of this library is loaded in this process; application state is not guaranteed to match");
            }
        });
        state
    }

    /// Like [`Self::global`], but fails once the lifecycle has reached
    /// [`Phase::Exit`] instead of handing back a singleton nothing should
    /// still be touching.
    pub fn checked_global() -> Result<&'static AppState, AppStateError> {
        let state = Self::global();
        if state.phase() == Phase::Exit {
            return Err(AppStateError::AccessAfterExit);
        }
        Ok(state)
    }

    #[cfg(test)]
    pub(crate) fn for_testing() -> Self { Self::construct() }

    #[must_use]
    pub fn phase(&self) -> Phase { Phase::from_u8(self.phase.load(Ordering::Acquire)) }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
        log::debug!("application state transitioned to {phase}");
    }

    /// True during `PreInit`, or on any thread with its loader flag set —
    /// both are "treat this as still-initializing code" for callers like
    /// logging or the atom manager.
    #[must_use]
    pub fn is_in_c_init(&self) -> bool { self.phase() == Phase::PreInit || self.is_loading_library() }

    #[must_use]
    pub fn is_app_running(&self) -> bool { matches!(self.phase(), Phase::RunInit | Phase::Run | Phase::RunExit) }

    #[must_use]
    pub fn is_in_c_exit(&self) -> bool { self.phase() == Phase::Exit }

    #[must_use]
    pub fn abi_mismatch(&self) -> bool { self.abi_mismatch.load(Ordering::Acquire) }

    #[must_use]
    pub fn main_thread_id(&self) -> u64 { self.main_thread_id }

    #[must_use]
    pub fn is_main_thread(&self) -> bool { current_thread_numeric_id() == self.main_thread_id }

    /// Marks (or clears) "the calling thread is currently loading a dynamic
    /// library" — a per-thread, not process-wide, flag.
    pub fn set_loading_library(&self, loading: bool) { LOADING_LIBRARY.with(|flag| flag.set(loading)); }

    #[must_use]
    pub fn is_loading_library(&self) -> bool { LOADING_LIBRARY.with(Cell::get) }

    #[must_use]
    pub fn is_debugger_present(&self) -> bool { debugger::is_debugger_present() }

    #[must_use]
    pub fn command_line(&self) -> Option<&CommandLine> { self.command_line.get() }

    pub(crate) fn set_command_line(&self, command_line: CommandLine) {
        // Re-entrant `AppStateMain` construction is a programming error;
        // the first command line wins rather than panicking.
        let _ = self.command_line.set(command_line);
    }

    #[must_use]
    pub fn temp_dir(&self) -> &Path { self.temp_dir.get_or_init(paths::temp_dir) }

    #[must_use]
    pub fn user_name(&self) -> &str { self.user_name.get_or_init(paths::user_name) }

    #[must_use]
    pub fn user_home(&self) -> &Path { self.user_home.get_or_init(paths::user_home) }

    #[must_use]
    pub fn exe_path(&self) -> &Path { self.exe_path.get_or_init(paths::exe_path) }

    /// Transitions to `Exit` and terminates the process immediately,
    /// bypassing the rest of `RunExit`. For fatal configuration errors
    /// only (e.g. [`AppStateError::AbiMismatch`]).
    #[allow(clippy::exit, reason = "this is the dedicated abort path; its entire job is terminating the process")]
    pub fn abort_app(&self, exit_code: i32) -> ! {
        self.set_phase(Phase::Exit);
        exit_catcher::mark_normal_exit();
        std::process::exit(exit_code);
    }
}

/// Stack sentinel modeling `AppStateMain(argc, argv)`: construct it at the
/// top of `main`, and it transitions the singleton through `RunInit` into
/// `Run`; dropping it (at the end of `main`) transitions through `RunExit`
/// into `Exit`.
#[must_use]
pub struct AppStateMain;

impl AppStateMain {
    pub fn new(command_line: CommandLine) -> Self {
        let state = AppState::global();
        state.set_command_line(command_line);
        state.set_phase(Phase::RunInit);
        state.set_phase(Phase::Run);
        Self
    }
}

impl Drop for AppStateMain {
    fn drop(&mut self) {
        let state = AppState::global();
        state.set_phase(Phase::RunExit);
        state.set_phase(Phase::Exit);
        exit_catcher::mark_normal_exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_starts_in_pre_init_and_is_not_running() {
        let state = AppState::for_testing();
        assert_eq!(state.phase(), Phase::PreInit);
        assert!(state.is_in_c_init());
        assert!(!state.is_app_running());
        assert!(!state.is_in_c_exit());
    }

    #[test]
    fn loading_library_flag_is_thread_local_and_feeds_is_in_c_init() {
        let state = AppState::for_testing();
        state.set_phase(Phase::Run);
        assert!(!state.is_in_c_init());
        state.set_loading_library(true);
        assert!(state.is_in_c_init());
        state.set_loading_library(false);
    }

    #[test]
    fn phase_transitions_match_the_declared_lifecycle() {
        let state = AppState::for_testing();
        state.set_phase(Phase::RunInit);
        assert!(state.is_app_running());
        state.set_phase(Phase::Run);
        assert!(state.is_app_running());
        assert!(!state.is_in_c_exit());
        state.set_phase(Phase::RunExit);
        assert!(state.is_app_running());
        state.set_phase(Phase::Exit);
        assert!(!state.is_app_running());
        assert!(state.is_in_c_exit());
    }

    #[test]
    fn command_line_is_set_once_and_then_read_only() {
        let state = AppState::for_testing();
        assert!(state.command_line().is_none());
        state.set_command_line(CommandLine::from_argv(["/bin/foo", "--bar"], false));
        assert_eq!(state.command_line().unwrap().enum_arg(0), Some("/bin/foo"));
        state.set_command_line(CommandLine::from_argv(["/bin/other"], false));
        assert_eq!(
            state.command_line().unwrap().enum_arg(0),
            Some("/bin/foo"),
            "second set must be ignored"
        );
    }

    #[test]
    fn global_singleton_reaches_run_then_exit_through_app_state_main() {
        let cmd = CommandLine::from_argv(["/bin/foo", "--bar"], false);
        {
            let _sentinel = AppStateMain::new(cmd);
            let state = AppState::global();
            assert_eq!(state.phase(), Phase::Run);
            assert_eq!(state.command_line().unwrap().enum_arg(0), Some("/bin/foo"));
            assert_eq!(state.command_line().unwrap().find_arg("--bar", true, true), Some(1));
        }
        assert_eq!(AppState::global().phase(), Phase::Exit);
        assert!(AppState::checked_global().is_err());
    }
}
