use std::fmt;

/// Failures surfaced by the application-state singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStateError {
    /// The singleton was reached after it entered [`crate::Phase::Exit`].
    AccessAfterExit,
    /// The ABI-probe environment variable was already set on construction —
    /// a second copy of this library is loaded into the same process.
    AbiMismatch,
}

impl fmt::Display for AppStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessAfterExit => write!(f, "application state accessed after the Exit phase"),
            Self::AbiMismatch => write!(f, "a second copy of this library is already loaded in this process"),
        }
    }
}

impl std::error::Error for AppStateError {}
