//! Locale detection for compose table lookup

use std::ffi::OsString;

/// Variables consulted in order; the first non-empty one wins
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_CTYPE", "LANG"];

/// Fallback when nothing is set
pub const DEFAULT_LOCALE: &str = "C";

/// Locale from the process environment
pub fn detect() -> OsString {
    detect_with(|name| std::env::var_os(name))
}

/// Locale from an arbitrary variable lookup
pub fn detect_with<F>(lookup: F) -> OsString
where
    F: Fn(&str) -> Option<OsString>,
{
    LOCALE_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| OsString::from(DEFAULT_LOCALE))
}
