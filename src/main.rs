//! Binary entry point for mnemo.
//!
//! This binary provides the CLI interface for the mnemo memory engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use mnemo::batch::AgentRun;
use mnemo::config::MnemoConfig;
use mnemo::models::{AgentName, DocumentKind};
use mnemo::observability;
use mnemo::prune::DocumentStatus;
use mnemo::store::{ContextStore, UpdateMode};
use mnemo::{BatchOrchestrator, Error, KnowledgeConsolidator};
use std::path::PathBuf;
use std::process::ExitCode;

/// Mnemo - bounded memory documents for autonomous agents.
#[derive(Parser)]
#[command(name = "mnemo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "MNEMO_CONFIG_PATH")]
    config: Option<String>,

    /// Store root directory (overrides config and MNEMO_STORE_DIR).
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Create an agent's context store from templates.
    Init {
        /// Agent to initialize; omit to only create the store root.
        agent: Option<String>,
    },

    /// Apply a low-level mutation to one document.
    Update {
        /// Agent name.
        agent: String,

        /// Document name, e.g. session-history.
        document: String,

        /// Mutation mode: append, prepend, or replace.
        mode: String,

        /// Content to write.
        content: String,
    },

    /// List known agents.
    List,

    /// Regenerate one agent's core knowledge.
    Extract {
        /// Agent name.
        agent: String,
    },

    /// Regenerate core knowledge for every agent.
    ExtractAll,

    /// Print the current core knowledge as structured entries.
    Load {
        /// Agent name.
        agent: String,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Extract, then prune, one agent or every agent.
    Prune {
        /// Agent name; omit to run over the whole store.
        agent: Option<String>,
    },

    /// Show store status.
    Status,
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    observability::init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref(), cli.store.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: MnemoConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init { agent } => cmd_init(&config, agent),
        Commands::Update {
            agent,
            document,
            mode,
            content,
        } => cmd_update(&config, &agent, &document, &mode, &content),
        Commands::List => cmd_list(&config),
        Commands::Extract { agent } => cmd_extract(&config, &agent),
        Commands::ExtractAll => cmd_extract_all(&config),
        Commands::Load { agent, format } => cmd_load(&config, &agent, &format),
        Commands::Prune { agent } => cmd_prune(&config, agent),
        Commands::Status => cmd_status(&config),
    }
}

/// Loads configuration.
fn load_config(
    path: Option<&str>,
    store_override: Option<PathBuf>,
) -> Result<MnemoConfig, Box<dyn std::error::Error>> {
    let mut config = if let Some(config_path) = path {
        let mut loaded = MnemoConfig::load_from_file(std::path::Path::new(config_path))?;
        loaded.apply_env_overrides();
        loaded
    } else {
        MnemoConfig::load_default()
    };

    if let Some(store) = store_override {
        config.store_dir = store;
    }
    Ok(config)
}

/// Init command.
fn cmd_init(
    config: &MnemoConfig,
    agent: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ContextStore::with_create(&config.store_dir)?;

    let Some(name) = agent else {
        println!("Store root ready: {}", store.root().display());
        return Ok(());
    };

    let agent = AgentName::new(&name)?;
    let report = store.init_agent(&agent)?;
    println!(
        "Initialized agent '{agent}': {} files created, {} already present",
        report.created.len(),
        report.skipped.len()
    );
    Ok(())
}

/// Update command.
fn cmd_update(
    config: &MnemoConfig,
    agent: &str,
    document: &str,
    mode: &str,
    content: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ContextStore::new(&config.store_dir);

    // Validate everything before mutating anything.
    let agent = store.resolve_agent(agent)?;
    let kind = DocumentKind::parse(document)
        .ok_or_else(|| Error::UnknownDocument(document.to_string()))?;
    let mode = UpdateMode::parse(mode)
        .ok_or_else(|| Error::InvalidInput(format!("unknown update mode: {mode}")))?;

    store.update_document(&agent, kind, mode, content)?;
    println!("Updated {kind} for '{agent}' ({})", mode.as_str());
    Ok(())
}

/// List command.
fn cmd_list(config: &MnemoConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = ContextStore::new(&config.store_dir);
    let agents = store.list_agents()?;

    if agents.is_empty() {
        println!("No agents found in {}", store.root().display());
        return Ok(());
    }
    for agent in agents {
        println!("{agent}");
    }
    Ok(())
}

/// Extract command for one agent.
fn cmd_extract(config: &MnemoConfig, agent: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = ContextStore::new(&config.store_dir);
    let agent = store.resolve_agent(agent)?;

    let consolidator = KnowledgeConsolidator::new(store, config);
    let stats = consolidator.extract(&agent)?;
    println!("{}", stats.summary());
    Ok(())
}

/// Extract command for every agent.
fn cmd_extract_all(config: &MnemoConfig) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = BatchOrchestrator::new(config);
    let report = orchestrator.extract_all()?;
    print_batch(&report);

    if report.all_failed() {
        return Err("every agent failed".into());
    }
    Ok(())
}

/// Load command.
fn cmd_load(
    config: &MnemoConfig,
    agent: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ContextStore::new(&config.store_dir);
    let agent = store.resolve_agent(agent)?;
    let consolidator = KnowledgeConsolidator::new(store, config);
    let entries = consolidator.load(&agent)?;

    match format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        "text" => {
            if entries.is_empty() {
                println!("No core knowledge recorded for '{agent}'");
                return Ok(());
            }
            for entry in entries {
                println!(
                    "[{:.1}] {}: {} (from {})",
                    entry.score,
                    entry.category.display_name(),
                    entry.text,
                    entry.source
                );
            }
        },
        other => {
            return Err(Error::InvalidInput(format!("unknown format: {other}")).into());
        },
    }
    Ok(())
}

/// Prune command.
fn cmd_prune(
    config: &MnemoConfig,
    agent: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = BatchOrchestrator::new(config);

    if let Some(name) = agent {
        let agent = orchestrator.store().resolve_agent(&name)?;
        let run = orchestrator.run_agent(&agent)?;
        print_agent_run(&agent, &run);
        return Ok(());
    }

    let report = orchestrator.run_all()?;
    print_batch(&report);

    if report.all_failed() {
        return Err("every agent failed".into());
    }
    Ok(())
}

/// Status command.
fn cmd_status(config: &MnemoConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = ContextStore::new(&config.store_dir);

    println!("Mnemo Status");
    println!("============");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Store: {}", store.root().display());
    println!(
        "Importance threshold: {:.1}",
        config.importance_threshold
    );
    println!();

    let agents = store.list_agents()?;
    println!("Agents: {}", agents.len());
    for agent in agents {
        let mut present = 0;
        let mut lines = 0;
        for kind in DocumentKind::all() {
            let content = store.read_document(&agent, *kind)?;
            if !content.is_empty() {
                present += 1;
                lines += content.lines().count();
            }
        }
        println!("  {agent}: {present} documents, {lines} lines");
    }
    Ok(())
}

/// Prints the outcome of one agent's extract-and-prune run.
fn print_agent_run(agent: &AgentName, run: &AgentRun) {
    println!("{agent}: {}", run.extraction.summary());
    if let Some(pruning) = &run.pruning {
        println!("{agent}: {}", pruning.summary());
        for (kind, status) in &pruning.documents {
            if let DocumentStatus::Pruned {
                lines_before,
                lines_after,
            } = status
            {
                println!("  {kind}: {lines_before} -> {lines_after} lines");
            }
        }
    }
}

/// Prints a batch report.
fn print_batch(report: &mnemo::BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(run) => print_agent_run(&outcome.agent, run),
            Err(e) => println!("{}: failed: {e}", outcome.agent),
        }
    }
    println!("{}", report.summary());
}
