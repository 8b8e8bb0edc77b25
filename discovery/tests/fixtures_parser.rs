use std::fs;
use std::path::PathBuf;

use shell_catalog_core::DiscoveryState;
use shell_catalog_discovery::parser::HelpParser;
use shell_catalog_discovery::{ParsedListing, SectionMarker};

#[test]
fn test_zephyr_top_level_listing() {
    let help = fixture("zephyr_help.txt");
    let mut parser = HelpParser::top_level(&help);
    let listing = parser.parse();

    assert_eq!(listing.marker, Some(SectionMarker::TopLevel));
    assert_eq!(
        names(&listing),
        vec![
            "bypass", "clear", "device", "devmem", "help", "history", "kernel", "log", "resize",
            "retval", "shell",
        ]
    );
    assert!(parser.warnings().is_empty());
    assert!(
        listing
            .commands
            .iter()
            .all(|c| c.discovery_state == DiscoveryState::Unknown && c.full_path.len() == 1)
    );
}

#[test]
fn test_zephyr_top_level_continuations() {
    let listing = HelpParser::top_level(&fixture("zephyr_help.txt")).parse();

    let resize = listing
        .commands
        .iter()
        .find(|c| c.name == "resize")
        .unwrap();
    assert_eq!(
        resize.description,
        "Console gets terminal screen size or assumes default in case the readout fails. \
         It must be executed after each terminal width change to ensure correct text display."
    );
    assert!(resize.usage.is_none());

    let devmem = listing
        .commands
        .iter()
        .find(|c| c.name == "devmem")
        .unwrap();
    assert_eq!(devmem.description, "Read/write physical memory");
    let usage = devmem.usage.as_deref().unwrap();
    assert_eq!(usage.lines().count(), 4);
    assert!(usage.starts_with("Read memory at address with optional width:"));
    assert_eq!(arguments(&listing, "devmem"), vec![
        ("address", true),
        ("width", false),
        ("value", true),
    ]);
}

#[test]
fn test_log_subcommand_listing() {
    let help = fixture("log_help.txt");
    let listing = HelpParser::for_node(&["log"], &help).parse();

    assert_eq!(listing.marker, Some(SectionMarker::Subcommands));
    assert_eq!(
        names(&listing),
        vec![
            "backend",
            "disable",
            "enable",
            "go",
            "halt",
            "list_backends",
            "status",
            "mem",
        ]
    );
    assert_eq!(listing.commands[0].full_path, vec!["log", "backend"]);
    assert_eq!(listing.discovery_state(), DiscoveryState::HasChildren);
    assert_eq!(
        listing.own.description.as_deref(),
        Some("Commands for controlling logger")
    );

    let enable = &listing.commands[2];
    assert_eq!(
        enable.description,
        "'log enable <level> <module_0> ...  <module_n>' enables logs up to given level in \
         specified modules (all if no modules specified)."
    );
    assert_eq!(arguments(&listing, "enable"), vec![
        ("level", true),
        ("module_0", true),
        ("module_n", true),
    ]);
    assert!(arguments(&listing, "go").is_empty());
}

#[test]
fn test_devmem_own_help_has_no_children() {
    let listing = HelpParser::for_node(&["devmem"], &fixture("devmem_help.txt")).parse();

    assert!(listing.commands.is_empty());
    assert!(listing.marker.is_none());
    assert!(!listing.leaf);
    assert_eq!(listing.discovery_state(), DiscoveryState::NoChildren);
    assert_eq!(
        listing.own.description.as_deref(),
        Some("Read/write physical memory")
    );
    let own: Vec<_> = listing
        .own
        .arguments
        .iter()
        .map(|a| (a.name.as_str(), a.required))
        .collect();
    assert_eq!(own, vec![("address", true), ("width", false), ("value", true)]);
}

#[test]
fn test_bypass_is_short_circuited_as_leaf() {
    let listing = HelpParser::for_node(&["bypass"], &fixture("bypass_help.txt")).parse();

    assert!(listing.leaf);
    assert!(listing.commands.is_empty());
    assert_eq!(listing.discovery_state(), DiscoveryState::NoChildren);
    assert!(listing.warnings.is_empty());
}

#[test]
fn test_kernel_spaced_dialect_with_escapes_and_crlf() {
    let listing = HelpParser::for_node(&["kernel"], &fixture("kernel_help.txt")).parse();

    assert_eq!(
        names(&listing),
        vec!["cycles", "reboot", "stacks", "threads", "uptime", "version"]
    );
    let uptime = listing
        .commands
        .iter()
        .find(|c| c.name == "uptime")
        .unwrap();
    assert_eq!(uptime.full_path, vec!["kernel", "uptime"]);
    assert_eq!(
        uptime.description,
        "Kernel uptime. Can be called with the -p or --pretty options"
    );
    assert!(uptime.arguments.is_empty());
}

#[test]
fn test_top_level_fixture_as_subcommand_reply_is_parent_echo() {
    // Some shells answer an unknown `--help` with the full top-level listing.
    let help = fixture("zephyr_help.txt").replace("Available commands:", "Subcommands:");
    let listing = HelpParser::for_node(&["kernel"], &help)
        .with_siblings(["bypass", "clear", "device", "log"])
        .parse();

    assert!(listing.parent_echo);
    assert!(listing.commands.is_empty());
    assert_eq!(listing.discovery_state(), DiscoveryState::NoChildren);
}

fn names(listing: &ParsedListing) -> Vec<&str> {
    listing.commands.iter().map(|c| c.name.as_str()).collect()
}

fn arguments<'a>(listing: &'a ParsedListing, name: &str) -> Vec<(&'a str, bool)> {
    listing
        .commands
        .iter()
        .find(|c| c.name == name)
        .map(|c| {
            c.arguments
                .iter()
                .map(|a| (a.name.as_str(), a.required))
                .collect()
        })
        .unwrap_or_default()
}

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(path).expect("fixture file must be readable")
}
