//! Parses captured shell help output without a live channel.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p shell-catalog-discovery --example parse_help
//! ```

use shell_catalog_discovery::{parse_node_help, parse_top_level};

fn main() {
    let top_level = "\
uart:~$ help
Please press the <Tab> button to see all available commands.
Available commands:
  device  :Device commands
  devmem  :Read/write physical memory
           Usage:
           Read memory at address with optional width:
           devmem <address> [<width>]
  log     :Commands for controlling logger
uart:~$ ";

    let listing = parse_top_level(top_level);
    println!("Top-level commands ({}):", listing.commands.len());
    for command in &listing.commands {
        println!("  {}: {}", command.name, command.description);
        if let Some(usage) = &command.usage {
            for line in usage.lines() {
                println!("      {line}");
            }
        }
        for arg in &command.arguments {
            let req = if arg.required { "required" } else { "optional" };
            println!("      <{}> ({req})", arg.name);
        }
    }

    let log_help = "\
log - Commands for controlling logger
Subcommands:
  backend  :Logger backends commands.
  go       :Resume logging
  halt     :Halt logging
";

    let listing = parse_node_help(&["log"], log_help);
    println!("\nlog subcommands ({:?}):", listing.discovery_state());
    for command in &listing.commands {
        println!("  {}  {}", command.execution_string(), command.description);
    }

    if !listing.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &listing.warnings {
            println!("  - {warning}");
        }
    }
}
