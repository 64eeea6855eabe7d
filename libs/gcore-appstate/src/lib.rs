//! Process-wide application state: lifecycle phases, command-line parsing,
//! the cross-library ABI probe, and a handful of cached OS queries.
//!
//! [`AppState::global`] is the singleton accessor; [`AppStateMain`] is the
//! stack sentinel applications construct at the top of `main` to drive the
//! `PreInit -> RunInit -> Run -> RunExit -> Exit` lifecycle.

mod abi_probe;
mod command_line;
mod debugger;
mod error;
mod exit_catcher;
mod paths;
mod phase;
mod state;

pub use abi_probe::BuildSignature;
pub use command_line::CommandLine;
pub use debugger::is_debugger_present;
pub use error::AppStateError;
pub use phase::Phase;
pub use state::{AppState, AppStateMain};
