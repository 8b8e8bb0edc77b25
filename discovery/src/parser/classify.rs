//! Line classification.
//!
//! Every non-empty line of a help response is one of a handful of kinds. The
//! parser's section state machine works on these kinds only, so adding a new
//! listing dialect means adding a variant here rather than another special
//! case in the parser.

use regex::Regex;
use std::sync::LazyLock;

/// Which listing a section marker opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionMarker {
    /// `Available commands:`, the top-level listing.
    TopLevel,
    /// `Subcommands:`, a node's child listing.
    Subcommands,
}

/// How a command entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Dialect {
    /// `name : description` (any spacing around the colon).
    Colon,
    /// `name  description` (two or more spaces or a tab).
    Spaced,
    /// `name - description`.
    Dash,
    /// `name` alone.
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum LineKind<'a> {
    Marker(SectionMarker),
    /// `Usage:` with optional text after the colon.
    Usage(&'a str),
    Command {
        name: &'a str,
        description: &'a str,
        dialect: Dialect,
    },
    /// A short line ending with `:` that opens some other section.
    Header,
    Text,
}

/// Longest line still treated as a section header.
const MAX_HEADER_LEN: usize = 40;

struct LinePatterns {
    top_marker: Regex,
    sub_marker: Regex,
    usage: Regex,
    colon_entry: Regex,
    column_break: Regex,
    name: Regex,
}

static PATTERNS: LazyLock<LinePatterns> = LazyLock::new(|| LinePatterns {
    // All regexes here are compile-time constants.
    top_marker: Regex::new(r"(?i)^available commands\s*:?$").expect("static regex must compile"),
    sub_marker: Regex::new(r"(?i)^sub-?commands\s*:?$").expect("static regex must compile"),
    usage: Regex::new(r"(?i)^usage\s*:\s*(.*)$").expect("static regex must compile"),
    colon_entry: Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_.\-]*)(\s*):\s*(.*)$")
        .expect("static regex must compile"),
    column_break: Regex::new(r"\t+| {2,}").expect("static regex must compile"),
    name: Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").expect("static regex must compile"),
});

/// Classifies one trimmed line.
pub(super) fn classify_line(trimmed: &str) -> LineKind<'_> {
    if PATTERNS.top_marker.is_match(trimmed) {
        return LineKind::Marker(SectionMarker::TopLevel);
    }
    if PATTERNS.sub_marker.is_match(trimmed) {
        return LineKind::Marker(SectionMarker::Subcommands);
    }
    if let Some(caps) = PATTERNS.usage.captures(trimmed) {
        let inline = caps.get(1).map_or("", |m| m.as_str().trim());
        return LineKind::Usage(inline);
    }

    if let Some(caps) = PATTERNS.colon_entry.captures(trimmed) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let spaced = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        let description = caps.get(3).map_or("", |m| m.as_str().trim());
        // "Options:" is a header, "go :" and "go:Resume" are entries.
        if spaced || !description.is_empty() {
            return LineKind::Command {
                name,
                description,
                dialect: Dialect::Colon,
            };
        }
    }

    if let Some((name, description)) = split_two_columns(trimmed) {
        if is_command_name(name) {
            return LineKind::Command {
                name,
                description,
                dialect: Dialect::Spaced,
            };
        }
    }

    if let Some((name, description)) = split_dash_separator(trimmed) {
        if is_command_name(name) {
            return LineKind::Command {
                name,
                description,
                dialect: Dialect::Dash,
            };
        }
    }

    if trimmed.ends_with(':') && trimmed.len() < MAX_HEADER_LEN {
        return LineKind::Header;
    }

    if is_command_name(trimmed) {
        return LineKind::Command {
            name: trimmed,
            description: "",
            dialect: Dialect::Bare,
        };
    }

    LineKind::Text
}

pub(super) fn is_command_name(token: &str) -> bool {
    PATTERNS.name.is_match(token)
}

pub(super) fn split_two_columns(line: &str) -> Option<(&str, &str)> {
    let capture = PATTERNS.column_break.find(line)?;
    let left = line[..capture.start()].trim();
    let right = line[capture.end()..].trim();
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, right))
}

pub(super) fn split_dash_separator(line: &str) -> Option<(&str, &str)> {
    let (head, tail) = line.split_once(" - ")?;
    let left = head.trim();
    let right = tail.trim();
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, right))
}

/// Returns `true` for lines that start with a lowercase letter.
pub(super) fn is_lowercase_leading(trimmed: &str) -> bool {
    trimmed.chars().next().is_some_and(|ch| ch.is_lowercase())
}
