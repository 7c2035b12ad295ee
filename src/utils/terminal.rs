//! Terminal output sanitization
//!
//! # Security: Terminal Injection Prevention
//!
//! Titles, previews and status text come from imported exports and are printed to the
//! terminal by `search` and `stats`. Escape sequences embedded in that data could clear
//! the screen, move the cursor or rewrite the window title, so everything user-derived
//! goes through [`sanitize_line`] before display.

use std::sync::LazyLock;

use regex::Regex;

// CSI sequences (ESC [ ... final byte) and OSC sequences (ESC ] ... BEL or ESC \)
static ESCAPE_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?")
        .expect("valid escape sequence regex")
});

/// Removes ANSI escape sequences and control characters other than tab and newlines
///
/// # Examples
///
/// ```
/// use memory_album::utils::terminal::strip_ansi_codes;
///
/// assert_eq!(strip_ansi_codes("\x1b[31mRed\x1b[0m text"), "Red text");
/// ```
pub fn strip_ansi_codes(text: &str) -> String {
    ESCAPE_SEQUENCE
        .replace_all(text, "")
        .chars()
        .filter(|&c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// One display line: escapes stripped, whitespace runs collapsed, cut to `max_chars`
/// characters with a trailing ellipsis when longer.
pub fn sanitize_line(text: &str, max_chars: usize) -> String {
    let cleaned = strip_ansi_codes(text);
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
