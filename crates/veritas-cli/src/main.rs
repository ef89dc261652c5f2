//! Veritas CLI: Verify credentials and presentations against policies.
//!
//! Subcommands: init, verify, presentation, status, policies.

mod commands;
mod config;
mod engine;
mod fetcher;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{LoggingConfig, VeritasConfig};
use engine::Engine;

/// Veritas: credential verification policy engine.
#[derive(Parser, Debug)]
#[command(name = "veritas", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "veritas.toml")]
    config: PathBuf,

    /// Log level, overriding the configuration file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Verify a credential against a set of policies.
    Verify(commands::verify::VerifyArgs),
    /// Verify a presentation and the credentials it embeds.
    Presentation(commands::presentation::PresentationArgs),
    /// Resolve the revocation and suspension status of a credential.
    Status(commands::status::StatusArgs),
    /// List the available policies.
    Policies(commands::policies::PoliciesArgs),
}

fn init_tracing(logging: &LoggingConfig, override_level: Option<&str>) {
    let level = override_level.unwrap_or(&logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.with_target(true).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init(args) = &cli.command {
        return commands::init::run(args, &cli.config);
    }

    let config = VeritasConfig::load(&cli.config)?;
    init_tracing(&config.logging, cli.log_level.as_deref());
    let engine = Engine::from_config(&config)?;

    match &cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Verify(args) => commands::verify::run(args, &engine).await,
        Commands::Presentation(args) => commands::presentation::run(args, &engine).await,
        Commands::Status(args) => commands::status::run(args, &engine).await,
        Commands::Policies(args) => commands::policies::run(args, &engine),
    }
}
