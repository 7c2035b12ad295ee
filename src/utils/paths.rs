use std::borrow::Cow;
use std::env;
use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

// Everything except RFC 3986 unreserved characters
const ENTRY_ENCODE_SET: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encodes one component of an archive entry name
///
/// Record ids are caller-supplied and may contain `/`, `:` or `..`, which would
/// otherwise create directories or escape the bundle prefix when extracted.
///
/// # Examples
///
/// ```
/// use memory_album::utils::paths::encode_entry_component;
///
/// assert_eq!(encode_entry_component("img/01:a b"), "img%2F01%3Aa%20b");
/// ```
pub fn encode_entry_component(component: &str) -> String {
    utf8_percent_encode(component, ENTRY_ENCODE_SET).to_string()
}

/// Formats a path with ~ substitution for the home directory
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

/// Internal helper for path formatting with optional home override (for testing)
pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && path_str.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}
