//! Help-text normalization utilities.

use regex::Regex;
use std::sync::LazyLock;

use super::IndexedLine;

/// Width a tab counts for when measuring indentation.
const TAB_WIDTH: usize = 4;

/// Removes terminal escape sequences, overstrike pairs and control characters.
///
/// Line breaks (`\n`, `\r`) and tabs survive.
pub fn strip_escapes(raw: &str) -> String {
    // SAFETY: These regexes are compile-time constants and are validated by tests.
    static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b[()][0-9A-Za-z]|\x1b[@-Z\\-_]")
            .expect("static regex must compile")
    });
    static OVERSTRIKE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r".\x08").expect("static regex must compile"));

    let stripped = ANSI_RE.replace_all(raw, "");
    let mut cleaned = stripped.into_owned();
    while OVERSTRIKE_RE.is_match(&cleaned) {
        cleaned = OVERSTRIKE_RE.replace_all(&cleaned, "").into_owned();
    }
    cleaned.retain(|ch| !ch.is_control() || matches!(ch, '\n' | '\r' | '\t'));
    cleaned
}

/// Strips escapes and converts every line break to `\n`, trimming trailing
/// whitespace from each line.
pub fn normalize_help_output(raw: &str) -> String {
    let cleaned = strip_escapes(raw);
    let replaced = cleaned.replace("\r\n", "\n").replace('\r', "\n");

    replaced
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits normalized text into non-empty lines, keeping each line's
/// indentation width and original position.
pub fn to_indexed_lines(normalized: &str) -> Vec<IndexedLine> {
    normalized
        .lines()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| IndexedLine {
            index,
            indent: indent_width(text),
            text: text.trim().to_string(),
        })
        .collect()
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|ch| ch.is_whitespace())
        .map(|ch| if ch == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}
