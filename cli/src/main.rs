use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shell_catalog_core::{ArgumentSpec, Catalog, CommandNode, DiscoveryState};
use shell_catalog_discovery::{
    DiscoveryConfig, DiscoveryOrchestrator, HelpParser, PromptMatcher, ScanOutcome, ScanReport,
    TcpChannel,
};
use shell_catalog_store::{CatalogStore, FileCatalogStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Output format for `show`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ShowFormat {
    Tree,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "shell-catalog")]
#[command(about = "Discover and inspect the command tree of a remote shell")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse captured help output without a live shell.
    Parse(ParseArgs),
    /// Scan a live shell over TCP and update the catalog.
    Scan(ScanArgs),
    /// Print a cached catalog.
    Show(ShowArgs),
    /// Check a cached catalog and explain why it would be rejected.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// File containing the captured response, or `-` for stdin.
    #[arg(long, default_value = "-")]
    input: String,
    /// Space-separated path of the probed node (e.g. "log backend").
    /// Omit for a top-level `help` response.
    #[arg(long)]
    node: Option<String>,
    /// Prompt regex used to drop prompt and echo lines.
    #[arg(long)]
    prompt: Option<String>,
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Shell address as HOST:PORT.
    #[arg(long)]
    connect: String,
    /// Catalog JSON file to read and update.
    #[arg(long)]
    catalog: PathBuf,
    /// Re-probe the top level and replace the root list.
    #[arg(long)]
    force: bool,
    /// Discover a single node (space-separated path) instead of walking the tree.
    #[arg(long)]
    node: Option<String>,
    /// YAML discovery configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Delay between probes in milliseconds (overrides the config file).
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Seconds before the scan pauses for confirmation; 0 disables the pause.
    #[arg(long)]
    pause_after_secs: Option<u64>,
    /// Continue automatically when the scan pauses.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Catalog JSON file.
    #[arg(long)]
    catalog: PathBuf,
    /// Output format.
    #[arg(long, default_value = "tree")]
    format: ShowFormat,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Catalog JSON file.
    #[arg(long)]
    catalog: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Scan(args) => run_scan(args),
        Command::Show(args) => run_show(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ParseOutput {
    node: Vec<String>,
    state: DiscoveryState,
    leaf: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<ArgumentSpec>,
    commands: Vec<CommandNode>,
    warnings: Vec<String>,
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let help_text = read_input(&args.input)?;
    let path = args.node.as_deref().map(split_path).unwrap_or_default();

    let mut parser = if path.is_empty() {
        HelpParser::top_level(&help_text)
    } else {
        HelpParser::for_node(&path, &help_text)
    };
    if let Some(pattern) = &args.prompt {
        let prompt =
            PromptMatcher::new(pattern).map_err(|err| format!("Invalid --prompt: {err}"))?;
        parser = parser.with_prompt(prompt);
    }
    let listing = parser.parse();

    if path.is_empty() && listing.commands.is_empty() {
        return Err("No commands found in top-level help output".to_string());
    }

    let output = ParseOutput {
        node: path,
        state: listing.discovery_state(),
        leaf: listing.leaf,
        description: listing.own.description,
        usage: listing.own.usage,
        arguments: listing.own.arguments,
        commands: listing.commands,
        warnings: listing.warnings.iter().map(ToString::to_string).collect(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|err| format!("Failed to serialize output: {err}"))?;
    println!("{json}");
    Ok(())
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        return Ok(text);
    }
    fs::read_to_string(input).map_err(|err| format!("Failed to read '{input}': {err}"))
}

fn split_path(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn run_scan(args: ScanArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => DiscoveryConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => DiscoveryConfig::default(),
    };
    if let Some(delay) = args.delay_ms {
        config.scan.inter_probe_delay_ms = delay;
    }
    if let Some(secs) = args.pause_after_secs {
        config.scan.long_scan_threshold_secs = secs;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to start runtime: {err}"))?;
    let report = runtime.block_on(scan(args, config))?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("Failed to serialize report: {err}"))?;
    println!("{json}");

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

async fn scan(args: ScanArgs, config: DiscoveryConfig) -> Result<ScanReport, String> {
    let channel = Arc::new(TcpChannel::new());
    let store = Arc::new(FileCatalogStore::new(&args.catalog));
    let orchestrator = DiscoveryOrchestrator::new(channel.clone(), store, config)
        .map_err(|err| format!("Invalid configuration: {err}"))?;

    channel.set_data_callback(orchestrator.data_sink());
    channel
        .connect(args.connect.as_str())
        .await
        .map_err(|err| format!("Failed to connect to '{}': {err}", args.connect))?;
    info!(addr = %args.connect, "connected");

    let handle = orchestrator.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling after the current probe...");
            handle.cancel();
        }
    });

    let mut result = match &args.node {
        Some(node) => orchestrator.discover_node(&split_path(node)).await,
        None => orchestrator.start_scan(args.force).await,
    };

    let report = loop {
        let report = result.map_err(|err| err.to_string())?;
        if report.outcome != ScanOutcome::Paused {
            break report;
        }

        eprintln!(
            "scan paused after {}s ({} of {} nodes)",
            report.elapsed_ms / 1000,
            report.progress.current,
            report.progress.total
        );
        let proceed = args.yes || confirm("continue scanning? [y/N] ").await;
        if !proceed || !orchestrator.handle().is_paused() {
            break orchestrator.cancel().unwrap_or(report);
        }
        result = orchestrator.resume().await;
    };

    channel.disconnect().await;
    Ok(report)
}

async fn confirm(question: &'static str) -> bool {
    let answer = tokio::task::spawn_blocking(move || {
        eprint!("{question}");
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await;

    match answer {
        Ok(Ok(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// show / validate
// ---------------------------------------------------------------------------

fn load_catalog(path: &Path) -> Result<Catalog, String> {
    FileCatalogStore::new(path)
        .load_with_reason()
        .map_err(|miss| format!("No usable catalog at '{}': {miss}", path.display()))
}

fn run_show(args: ShowArgs) -> Result<(), String> {
    let catalog = load_catalog(&args.catalog)?;
    match args.format {
        ShowFormat::Json => {
            let json = serde_json::to_string_pretty(&catalog)
                .map_err(|err| format!("Failed to serialize catalog: {err}"))?;
            println!("{json}");
        }
        ShowFormat::Tree => print!("{}", render_tree(&catalog)),
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let catalog = load_catalog(&args.catalog)?;
    println!(
        "Catalog OK: version {}, {} top-level command(s), {} node(s), {} pending probe(s).",
        catalog.version,
        catalog.commands.len(),
        catalog.node_count(),
        catalog.pending_paths().len()
    );
    Ok(())
}

fn render_tree(catalog: &Catalog) -> String {
    let mut out = String::new();
    for node in catalog.walk() {
        let depth = node.full_path.len().saturating_sub(1);
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.name);
        if !node.description.is_empty() {
            out.push_str(" - ");
            out.push_str(&node.description);
        }
        if node.discovery_state == DiscoveryState::Unknown {
            out.push_str(" (not probed)");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_trims_and_drops_empty() {
        assert_eq!(split_path("  log   backend "), vec!["log", "backend"]);
        assert!(split_path("   ").is_empty());
    }

    #[test]
    fn test_render_tree_indents_by_depth() {
        let mut log = CommandNode::root("log").with_description("Logging");
        log.children.push(
            log.child("go")
                .with_description("Resume logging")
                .with_state(DiscoveryState::NoChildren),
        );
        log.discovery_state = DiscoveryState::HasChildren;
        let mut catalog = Catalog::new();
        catalog.commands.push(log);
        catalog.commands.push(CommandNode::root("kernel"));

        assert_eq!(
            render_tree(&catalog),
            "log - Logging\n  go - Resume logging\nkernel (not probed)\n"
        );
    }
}
