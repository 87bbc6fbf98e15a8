//! Contoso sales agent
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use contoso_agent::backend::AgentBackend;
use contoso_agent::{cli, AgentsClient, Config, Lab, Repl};
use tracing_subscriber::EnvFilter;

/// Chat with an agent that answers questions about Contoso sales data
#[derive(Parser, Debug)]
#[command(name = "contoso-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session variant to run
    #[arg(long, short = 'l', value_enum)]
    lab: Option<Lab>,

    /// Model deployment name
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Agents service endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory holding instructions, database and downloaded files
    #[arg(long)]
    shared_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Keep the agent and thread after a single prompt
    #[arg(long, requires = "prompt")]
    keep: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long, conflicts_with = "print_config")]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(lab) = args.lab {
        config.agent.lab = lab;
    }

    if let Some(ref model) = args.model {
        config.model.deployment = model.clone();
    }

    if let Some(ref endpoint) = args.endpoint {
        config.backend.endpoint = endpoint.clone();
    }

    if let Some(ref shared_dir) = args.shared_dir {
        config.paths.shared_dir = shared_dir.clone();
    }

    if args.debug {
        config.agent.debug = true;
    }

    let default_filter = if config.agent.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.print_config {
        println!("# {}", Config::config_file().display());
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    if args.init_config {
        let path = config.save().context("Failed to write config file")?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    config.validate()?;
    let backend: Arc<dyn AgentBackend> = Arc::new(
        AgentsClient::from_config(&config).context("Failed to create agents client")?,
    );

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        cli::run_once(&config, backend, &prompt, args.keep).await?;
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::new(config, backend);
    repl.run().await?;

    Ok(())
}
