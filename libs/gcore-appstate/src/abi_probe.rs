//! Detects two copies of this library sharing one process: each singleton
//! writes its own address into a process environment variable keyed by a
//! build signature, so an incompatible second copy loaded into the same
//! process is caught as a mismatch rather than silently corrupting state.

use crate::error::AppStateError;

const ENV_VAR_BASE: &str = "GrayCoreAppState";

/// `(library-version, size_of::<AppState>())`, embedded in the probe's
/// variable name so two builds with an incompatible layout never compare
/// against the same variable.
pub type BuildSignature = (u32, usize);

#[must_use]
pub(crate) fn env_var_name(signature: BuildSignature) -> String {
    format!("{ENV_VAR_BASE}{:x}{:x}", signature.0, signature.1)
}

/// Encodes `addr` the way the legacy format requires: lower-case hex, no
/// `0x` prefix, no fixed width. Kept bit-for-bit stable since this is an
/// observable cross-process ABI.
#[must_use]
pub(crate) fn encode_address(addr: usize) -> String { format!("{addr:x}") }

/// If the variable is already set, a second copy of this library is loaded
/// into the process — reported as [`AppStateError::AbiMismatch`] without
/// touching the variable. Otherwise writes `addr` and returns `Ok(())`.
pub(crate) fn probe_and_register(signature: BuildSignature, addr: usize) -> Result<(), AppStateError> {
    let name = env_var_name(signature);
    if std::env::var(&name).is_ok() {
        return Err(AppStateError::AbiMismatch);
    }
    std::env::set_var(&name, encode_address(addr));
    Ok(())
}
