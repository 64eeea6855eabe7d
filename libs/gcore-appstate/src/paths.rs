//! Cached OS queries. `std::env`/`std::path` only — this is the one place
//! this crate prefers the standard library over a crate: a user-name lookup
//! is a few lines of `USER`/`USERNAME` branching, not an ecosystem concern.

use std::path::PathBuf;

#[must_use]
pub(crate) fn temp_dir() -> PathBuf { std::env::temp_dir() }

#[must_use]
pub(crate) fn exe_path() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|_| PathBuf::from(std::env::args().next().unwrap_or_default()))
}

#[must_use]
pub(crate) fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

#[must_use]
pub(crate) fn user_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| temp_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_is_non_empty() { assert!(!temp_dir().as_os_str().is_empty()); }

    #[test]
    fn exe_path_is_non_empty() { assert!(!exe_path().as_os_str().is_empty()); }
}
