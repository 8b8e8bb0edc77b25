//! Command-tree discovery for remote interactive shells.
//!
//! This crate walks the command tree of a Zephyr-style shell over a live text
//! channel. It sends `help` and `<path> --help` probes, frames each response
//! without any protocol support, parses the help text into
//! [`CommandNode`](shell_catalog_core::CommandNode)s and merges them into a
//! persisted [`Catalog`](shell_catalog_core::Catalog).
//!
//! # Main entry points
//!
//! - [`DiscoveryOrchestrator`]: runs scans under a single discovery lock,
//!   with cooperative pause and cancel through a [`ScanHandle`].
//! - [`parse_top_level`] / [`parse_node_help`]: parse captured help text
//!   without a channel.
//! - [`TcpChannel`]: a [`ChannelAdapter`] over a raw TCP (telnet-style)
//!   stream.
//!
//! # Example
//!
//! ```
//! use shell_catalog_discovery::{parse_node_help, parse_top_level};
//!
//! let help = "\
//! Available commands:
//!   log     :Commands for controlling logger
//!   device  :Device commands
//! uart:~$ ";
//!
//! let listing = parse_top_level(help);
//! let names: Vec<_> = listing.commands.iter().map(|c| c.name.as_str()).collect();
//! assert_eq!(names, vec!["log", "device"]);
//!
//! let listing = parse_node_help(&["bypass"], "bypass - Bypass shell");
//! assert!(listing.commands.is_empty());
//! assert!(listing.leaf);
//! ```

pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod framer;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod report;
pub mod session;
pub mod tcp;

pub use buffer::ResponseBuffer;
pub use channel::{ChannelAdapter, DataCallback};
pub use config::{DiscoveryConfig, FramerConfig, ScanConfig};
pub use error::{ChannelError, ConfigError, DiscoveryError};
pub use framer::{Completion, FramedResponse, ProbeKind, ResponseFramer};
pub use orchestrator::{DiscoveryOrchestrator, ScanHandle};
pub use parser::{HelpParser, OwnHelp, ParseWarning, ParsedListing, SectionMarker};
pub use prompt::{DEFAULT_PROMPT_PATTERN, PromptMatcher};
pub use report::{Progress, ScanOutcome, ScanReport, ScanWarning, WarningKind};
pub use session::{ScanEnd, ScanPhase, ScanState, ScanStatus};
pub use tcp::TcpChannel;

/// Parses a captured response to the top-level `help` probe.
pub fn parse_top_level(help_output: &str) -> ParsedListing {
    HelpParser::top_level(help_output).parse()
}

/// Parses a captured response to `<path> --help`.
///
/// # Examples
///
/// ```
/// use shell_catalog_discovery::parse_node_help;
///
/// let help = "\
/// Subcommands:
///   backend :Enable backend logging
///   enable  :Enable logs
/// ";
///
/// let listing = parse_node_help(&["log"], help);
/// assert_eq!(listing.commands[0].full_path, vec!["log", "backend"]);
/// assert_eq!(listing.commands[1].full_path, vec!["log", "enable"]);
/// ```
pub fn parse_node_help<S: AsRef<str>>(path: &[S], help_output: &str) -> ParsedListing {
    HelpParser::for_node(path, help_output).parse()
}
