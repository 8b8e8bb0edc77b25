//! Help output parser for remote shell listings.
//!
//! Converts one framed probe response into command nodes. Two listings are
//! recognized:
//!
//! - **Top-level**: the response to `help`, opened by an
//!   `Available commands:` marker.
//! - **Subcommands**: the response to `<path> --help`, opened by a
//!   `Subcommands:` header. The lines before the header carry the probed
//!   node's own help (`name - description`, `Usage:` block).
//!
//! # Architecture
//!
//! Input is normalized (escape sequences stripped, prompt and echo lines
//! dropped) and split into indexed lines. Each line is classified into a
//! [`LineKind`](classify) and a small state machine walks the section after
//! the marker: command entries open a node, deeper-indented or
//! lowercase-leading lines continue it, a `Usage:` line switches the
//! continuation into the node's usage block, and anything else ends the
//! section. Argument specs are then extracted from each node's description
//! and usage with [`extract_arguments`].
//!
//! The primary entry point is [`HelpParser::top_level`] or
//! [`HelpParser::for_node`] followed by [`HelpParser::parse`].

mod arguments;
mod classify;
pub(crate) mod normalize;

use std::collections::HashSet;
use std::fmt;

use shell_catalog_core::{ArgumentSpec, CommandNode, DiscoveryState};
use tracing::debug;

use crate::prompt::PromptMatcher;
use classify::{Dialect, LineKind, classify_line, is_lowercase_leading, split_dash_separator};

pub use arguments::extract_arguments;
pub use classify::SectionMarker;

/// Most non-empty lines a response may have to short-circuit as a leaf.
const LEAF_MAX_LINES: usize = 3;

/// Longest description a leaf short-circuit accepts.
const LEAF_MAX_DESCRIPTION: usize = 120;

/// Sibling names a listing must repeat to count as an echo of the parent.
const PARENT_ECHO_MIN_SIBLINGS: usize = 3;

#[derive(Debug, Clone)]
pub(crate) struct IndexedLine {
    pub(crate) index: usize,
    pub(crate) indent: usize,
    pub(crate) text: String,
}

/// Non-fatal parse findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// The response was empty.
    EmptyOutput,
    /// A section marker was found but no line matched the entry grammar.
    Ambiguous(SectionMarker),
    /// A command name appeared twice in one listing; the first entry wins.
    DuplicateCommand(String),
    /// A listing named the probed node itself; the entry was dropped.
    SelfReference(String),
    /// The listing repeated the parent's children; treated as no children.
    ParentEcho(String),
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOutput => write!(f, "empty help output"),
            Self::Ambiguous(marker) => {
                write!(f, "{marker:?} marker found but no command lines matched")
            }
            Self::DuplicateCommand(name) => write!(f, "duplicate command '{name}' ignored"),
            Self::SelfReference(name) => write!(f, "self-referencing entry '{name}' dropped"),
            Self::ParentEcho(path) => write!(f, "'{path}' echoed its parent's help"),
        }
    }
}

/// The probed node's own help, taken from the lines before the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnHelp {
    pub description: Option<String>,
    pub usage: Option<String>,
    pub arguments: Vec<ArgumentSpec>,
}

/// Result of parsing one probe response.
#[derive(Debug, Clone, Default)]
pub struct ParsedListing {
    /// Listed commands in order, with `full_path` extending the probed path
    /// and `discovery_state` [`Unknown`](DiscoveryState::Unknown).
    pub commands: Vec<CommandNode>,
    /// The section marker that opened the listing, if any.
    pub marker: Option<SectionMarker>,
    /// The response was short-circuited as a trivial leaf.
    pub leaf: bool,
    /// The response was recognized as the parent's help.
    pub parent_echo: bool,
    pub own: OwnHelp,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedListing {
    /// State the probed node takes once this listing is attached.
    pub fn discovery_state(&self) -> DiscoveryState {
        if self.commands.is_empty() {
            DiscoveryState::NoChildren
        } else {
            DiscoveryState::HasChildren
        }
    }

    /// `true` when a marker was found but nothing under it parsed.
    pub fn is_ambiguous(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::Ambiguous(_)))
    }
}

#[derive(Debug, Default)]
struct Entry {
    name: String,
    description: Vec<String>,
    usage: Vec<String>,
    in_usage: bool,
}

impl Entry {
    fn new(name: &str, description: &str) -> Self {
        let mut entry = Self {
            name: name.to_string(),
            ..Self::default()
        };
        if !description.is_empty() {
            entry.description.push(description.to_string());
        }
        entry
    }

    fn push_text(&mut self, text: &str) {
        if self.in_usage {
            self.usage.push(text.to_string());
        } else {
            self.description.push(text.to_string());
        }
    }

    fn open_usage(&mut self, inline: &str) {
        self.in_usage = true;
        if !inline.is_empty() {
            self.usage.push(inline.to_string());
        }
    }

    fn into_node(self, parent: &[String]) -> CommandNode {
        let mut path = parent.to_vec();
        path.push(self.name);
        let description = self.description.join(" ");
        let usage = (!self.usage.is_empty()).then(|| self.usage.join("\n"));

        let mut node = CommandNode::at_path(path).with_description(&description);
        node.arguments = extract_arguments(&format!(
            "{description}\n{}",
            usage.as_deref().unwrap_or_default()
        ));
        node.usage = usage;
        node
    }
}

/// Parser for one shell help response.
///
/// # Examples
///
/// ```
/// use shell_catalog_discovery::parser::HelpParser;
///
/// let output = "\
/// log - Commands for controlling logger
/// Subcommands:
///   backend  :Logger backends commands.
///   go       :Resume logging
/// uart:~$ ";
///
/// let listing = HelpParser::for_node(&["log"], output).parse();
/// let paths: Vec<_> = listing.commands.iter().map(|c| c.execution_string()).collect();
/// assert_eq!(paths, vec!["log backend", "log go"]);
/// assert_eq!(
///     listing.own.description.as_deref(),
///     Some("Commands for controlling logger")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct HelpParser {
    path: Vec<String>,
    raw_output: String,
    prompt: PromptMatcher,
    siblings: HashSet<String>,
    warnings: Vec<ParseWarning>,
}

impl HelpParser {
    /// Parser for the response to the top-level `help` probe.
    pub fn top_level(help_output: &str) -> Self {
        Self::for_node::<&str>(&[], help_output)
    }

    /// Parser for the response to `<path> --help`.
    pub fn for_node<S: AsRef<str>>(path: &[S], help_output: &str) -> Self {
        Self {
            path: path.iter().map(|s| s.as_ref().to_string()).collect(),
            raw_output: help_output.to_string(),
            prompt: PromptMatcher::default(),
            siblings: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Uses a custom prompt matcher for prompt and echo line removal.
    pub fn with_prompt(mut self, prompt: PromptMatcher) -> Self {
        self.prompt = prompt;
        self
    }

    /// Names of the probed node's siblings, for the parent-echo guard.
    pub fn with_siblings<I, S>(mut self, siblings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.siblings = siblings
            .into_iter()
            .map(|s| s.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// The probe text this response answers.
    pub fn probe_text(&self) -> String {
        if self.path.is_empty() {
            "help".to_string()
        } else {
            format!("{} --help", self.path.join(" "))
        }
    }

    fn is_top_level(&self) -> bool {
        self.path.is_empty()
    }

    fn own_name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// Parses the response.
    pub fn parse(&mut self) -> ParsedListing {
        let mut listing = ParsedListing::default();
        self.warnings.clear();

        if self.raw_output.trim().is_empty() {
            self.warnings.push(ParseWarning::EmptyOutput);
            listing.warnings = self.warnings.clone();
            return listing;
        }

        let normalized = normalize::normalize_help_output(&self.raw_output);
        let lines: Vec<IndexedLine> = normalize::to_indexed_lines(&normalized)
            .into_iter()
            .filter(|line| !self.is_noise(&line.text))
            .collect();

        let marker_pos = lines.iter().position(|line| {
            matches!(classify_line(&line.text), LineKind::Marker(_))
        });
        let preamble = &lines[..marker_pos.unwrap_or(lines.len())];

        if !self.is_top_level() {
            listing.own = self.parse_own_help(preamble);
        }

        let Some(pos) = marker_pos else {
            listing.leaf = !self.is_top_level() && self.is_leaf_response(&lines);
            self.finish(&mut listing);
            return listing;
        };

        let marker = match classify_line(&lines[pos].text) {
            LineKind::Marker(marker) => marker,
            _ => SectionMarker::Subcommands,
        };
        listing.marker = Some(marker);

        let entries = Self::parse_section(&lines[pos + 1..]);
        if entries.is_empty() {
            self.warnings.push(ParseWarning::Ambiguous(marker));
            self.finish(&mut listing);
            return listing;
        }

        if self.is_parent_help_echo(&entries) {
            listing.parent_echo = true;
            self.warnings
                .push(ParseWarning::ParentEcho(self.path.join(" ")));
            self.finish(&mut listing);
            return listing;
        }

        let mut seen_names = HashSet::new();
        for entry in entries {
            if !self.is_top_level() && entry.name == self.own_name() {
                self.warnings
                    .push(ParseWarning::SelfReference(entry.name.clone()));
                continue;
            }
            if !seen_names.insert(entry.name.clone()) {
                self.warnings
                    .push(ParseWarning::DuplicateCommand(entry.name.clone()));
                continue;
            }
            listing.commands.push(entry.into_node(&self.path));
        }

        self.finish(&mut listing);
        listing
    }

    fn finish(&self, listing: &mut ParsedListing) {
        listing.warnings = self.warnings.clone();
        debug!(
            command = %self.probe_text(),
            commands = listing.commands.len(),
            marker = ?listing.marker,
            leaf = listing.leaf,
            warnings = listing.warnings.len(),
            "parsed help output"
        );
    }

    /// Prompt lines, prompt-prefixed echoes and the bare echoed probe.
    fn is_noise(&self, text: &str) -> bool {
        self.prompt.is_prompt_line(text)
            || self.prompt.echoed_command(text).is_some()
            || text == self.probe_text()
    }

    fn parse_own_help(&self, preamble: &[IndexedLine]) -> OwnHelp {
        let full = self.path.join(" ");
        let mut own = OwnHelp::default();
        let mut usage: Vec<&str> = Vec::new();
        let mut in_usage = false;

        for line in preamble {
            match classify_line(&line.text) {
                LineKind::Usage(inline) => {
                    in_usage = true;
                    if !inline.is_empty() {
                        usage.push(inline);
                    }
                }
                _ if in_usage => usage.push(&line.text),
                _ if own.description.is_none() => {
                    if let Some((left, right)) = split_dash_separator(&line.text) {
                        if left == self.own_name() || left == full {
                            own.description = Some(right.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        if !usage.is_empty() {
            own.usage = Some(usage.join("\n"));
        }
        own.arguments = extract_arguments(&format!(
            "{}\n{}",
            own.description.as_deref().unwrap_or_default(),
            own.usage.as_deref().unwrap_or_default()
        ));
        own
    }

    /// A trivial response: at most a few lines, one of which is
    /// `name - short description`.
    fn is_leaf_response(&self, lines: &[IndexedLine]) -> bool {
        if lines.is_empty() || lines.len() > LEAF_MAX_LINES {
            return false;
        }
        let full = self.path.join(" ");
        lines.iter().any(|line| {
            split_dash_separator(&line.text).is_some_and(|(left, right)| {
                (left == self.own_name() || left == full) && right.len() <= LEAF_MAX_DESCRIPTION
            })
        })
    }

    fn parse_section(lines: &[IndexedLine]) -> Vec<Entry> {
        let mut entries: Vec<Entry> = Vec::new();
        let mut base_indent: Option<usize> = None;

        for line in lines {
            let kind = classify_line(&line.text);
            if matches!(kind, LineKind::Marker(_)) {
                break;
            }

            if let Some(current) = entries.last_mut() {
                if base_indent.is_some_and(|base| line.indent > base) {
                    match kind {
                        LineKind::Usage(inline) => current.open_usage(inline),
                        _ => current.push_text(&line.text),
                    }
                    continue;
                }
            }

            if base_indent.is_some_and(|base| line.indent < base) {
                break;
            }

            match kind {
                LineKind::Command {
                    name,
                    description,
                    dialect,
                } if dialect != Dialect::Bare
                    || base_indent.map_or(line.indent > 0, |base| line.indent == base) =>
                {
                    base_indent.get_or_insert(line.indent);
                    entries.push(Entry::new(name, description));
                }
                LineKind::Usage(inline) if !entries.is_empty() => {
                    if let Some(current) = entries.last_mut() {
                        current.open_usage(inline);
                    }
                }
                _ if entries.last().is_some_and(|e| e.in_usage) => {
                    if let Some(current) = entries.last_mut() {
                        current.usage.push(line.text.clone());
                    }
                }
                LineKind::Text if !entries.is_empty() && is_lowercase_leading(&line.text) => {
                    if let Some(current) = entries.last_mut() {
                        current.description.push(line.text.clone());
                    }
                }
                _ => break,
            }
        }

        entries
    }

    /// The shell answered a subcommand probe with its parent's listing: the
    /// probed name plus several of its siblings.
    fn is_parent_help_echo(&self, entries: &[Entry]) -> bool {
        if self.is_top_level() || entries.len() < 2 {
            return false;
        }

        let parsed_names = entries
            .iter()
            .map(|e| e.name.to_ascii_lowercase())
            .collect::<HashSet<_>>();

        if !parsed_names.contains(&self.own_name().to_ascii_lowercase()) {
            return false;
        }

        let sibling_overlap = parsed_names.intersection(&self.siblings).count();
        sibling_overlap >= PARENT_ECHO_MIN_SIBLINGS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(listing: &ParsedListing) -> Vec<&str> {
        listing.commands.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_top_level_colon_dialect() {
        let output = "Available commands:\n  log : Logging commands\n  device : Device commands\n";
        let listing = HelpParser::top_level(output).parse();

        assert_eq!(names(&listing), vec!["log", "device"]);
        assert_eq!(listing.marker, Some(SectionMarker::TopLevel));
        assert!(
            listing
                .commands
                .iter()
                .all(|c| c.discovery_state == DiscoveryState::Unknown)
        );
        assert_eq!(listing.commands[0].full_path, vec!["log"]);
        assert_eq!(listing.commands[0].description, "Logging commands");
    }

    #[test]
    fn test_subcommand_paths_extend_probe() {
        let output = "Subcommands:\n  backend : Enable backend logging\n  enable : Enable logs\n";
        let listing = HelpParser::for_node(&["log"], output).parse();

        assert_eq!(listing.commands[0].full_path, vec!["log", "backend"]);
        assert_eq!(listing.commands[1].full_path, vec!["log", "enable"]);
        assert_eq!(listing.discovery_state(), DiscoveryState::HasChildren);
    }

    #[test]
    fn test_one_line_leaf() {
        let mut parser = HelpParser::for_node(&["bypass"], "bypass - Bypass shell");
        let listing = parser.parse();

        assert!(listing.leaf);
        assert!(listing.commands.is_empty());
        assert_eq!(listing.discovery_state(), DiscoveryState::NoChildren);
        assert_eq!(listing.own.description.as_deref(), Some("Bypass shell"));
        assert!(parser.warnings().is_empty());
    }

    #[test]
    fn test_spaced_dialect_and_continuations() {
        let output = "\
Subcommands:
  disable    'log disable <module_0> .. <module_n>' disables logs in
             specified modules (all if no modules specified).
  go         Resume logging
";
        let listing = HelpParser::for_node(&["log"], output).parse();

        assert_eq!(names(&listing), vec!["disable", "go"]);
        assert_eq!(
            listing.commands[0].description,
            "'log disable <module_0> .. <module_n>' disables logs in specified modules (all if no modules specified)."
        );
        let args: Vec<_> = listing.commands[0]
            .arguments
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(args, vec!["module_0", "module_n"]);
    }

    #[test]
    fn test_marker_without_entries_is_ambiguous() {
        let output = "Subcommands:\nThis command has no subcommands registered.\n";
        let listing = HelpParser::for_node(&["kernel", "uptime"], output).parse();

        assert!(listing.commands.is_empty());
        assert!(listing.is_ambiguous());
        assert_eq!(listing.discovery_state(), DiscoveryState::NoChildren);
    }

    #[test]
    fn test_section_stops_at_header() {
        let output = "\
Available commands:
  clear  :Clear screen.
  log    :Logging
Shell supports following meta-keys:
  Ctrl + (a key from: abcdefklnpuw)
";
        let listing = HelpParser::top_level(output).parse();
        assert_eq!(names(&listing), vec!["clear", "log"]);
    }

    #[test]
    fn test_prompt_and_echo_lines_are_dropped() {
        let output = "uart:~$ help\r\nAvailable commands:\r\n  log  :Logging\r\nuart:~$ ";
        let listing = HelpParser::top_level(output).parse();
        assert_eq!(names(&listing), vec!["log"]);

        let output = "log --help\r\nlog - Logging\r\nuart:~$ ";
        let listing = HelpParser::for_node(&["log"], output).parse();
        assert!(listing.leaf);
    }

    #[test]
    fn test_duplicate_and_self_entries_dropped() {
        let output = "Subcommands:\n  go  :Resume\n  net :Self\n  go  :Again\n";
        let mut parser = HelpParser::for_node(&["net"], output);
        let listing = parser.parse();

        assert_eq!(names(&listing), vec!["go"]);
        assert_eq!(listing.commands[0].description, "Resume");
        assert!(
            parser
                .warnings()
                .contains(&ParseWarning::SelfReference("net".to_string()))
        );
        assert!(
            parser
                .warnings()
                .contains(&ParseWarning::DuplicateCommand("go".to_string()))
        );
    }

    #[test]
    fn test_parent_echo_guard() {
        let output = "\
Subcommands:
  backend  :Logger backends commands.
  disable  :Disable logs.
  enable   :Enable logs.
  go       :Resume logging
  halt     :Halt logging
";
        let listing = HelpParser::for_node(&["log", "go"], output)
            .with_siblings(["backend", "disable", "enable", "halt"])
            .parse();

        assert!(listing.parent_echo);
        assert!(listing.commands.is_empty());
        assert_eq!(
            listing.warnings,
            vec![ParseWarning::ParentEcho("log go".to_string())]
        );

        // Without siblings the probed name is only a self-reference.
        let listing = HelpParser::for_node(&["log", "go"], output).parse();
        assert!(!listing.parent_echo);
        assert_eq!(listing.commands.len(), 4);
    }

    #[test]
    fn test_own_usage_block() {
        let output = "\
devmem - Read/write physical memory
Usage:
Read memory at address with optional width:
devmem <address> [<width>]
";
        let listing = HelpParser::for_node(&["devmem"], output).parse();

        assert!(!listing.leaf);
        assert!(listing.commands.is_empty());
        assert_eq!(
            listing.own.usage.as_deref(),
            Some("Read memory at address with optional width:\ndevmem <address> [<width>]")
        );
        let args: Vec<_> = listing
            .own
            .arguments
            .iter()
            .map(|a| (a.name.as_str(), a.required))
            .collect();
        assert_eq!(args, vec![("address", true), ("width", false)]);
    }

    #[test]
    fn test_empty_output_warns() {
        let mut parser = HelpParser::top_level("  \r\n");
        let listing = parser.parse();
        assert!(listing.commands.is_empty());
        assert_eq!(parser.warnings(), &[ParseWarning::EmptyOutput]);
    }
}
