//! Kubernetes Bill of Materials CLI
//!
//! Inventories the cluster selected by the kubeconfig and writes a bill of
//! materials in the native KBOM format or as a CycloneDX document.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Kubernetes Bill of Materials generator
#[derive(Parser)]
#[command(name = "kbom")]
#[command(author, version, about = "Kubernetes Bill of Materials generator", long_about = None)]
pub struct Cli {
    /// Kubeconfig context to use (defaults to the current context)
    #[arg(long, short, global = true)]
    pub context: Option<String>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a bill of materials for the cluster
    Generate(GenerateArgs),

    /// Print the JSON schema of the native KBOM document
    Schema,

    /// Print version information
    Version,
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Collect counts only, leaving out labels, annotations and resource names
    #[arg(long, overrides_with = "full")]
    pub short: bool,

    /// Collect full details, even when short mode is configured
    #[arg(long, overrides_with = "short")]
    pub full: bool,

    /// Where to write the document (stdout, file)
    #[arg(long, short)]
    pub output: Option<String>,

    /// Document format (json, yaml, cyclonedx-json, cyclonedx-xml)
    #[arg(long, short)]
    pub format: Option<String>,

    /// Directory for file output
    #[arg(long, short = 'p')]
    pub out_path: Option<PathBuf>,

    /// Only collect these namespaces (comma-separated)
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Only collect these resource kinds (comma-separated, e.g. deployment,pod)
    #[arg(long, short)]
    pub resource: Option<String>,

    /// Timeout for each cluster request, in seconds
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Number of resource kinds listed at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate(args) => {
            let settings = config::Settings::load()?;
            commands::generate::run(cli.context, args, settings).await?;
        }
        Commands::Schema => commands::schema::run()?,
        Commands::Version => commands::version::run(),
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the document
fn init_tracing(verbose: bool) {
    let level = if verbose { "trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if std::io::stderr().is_terminal() {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    }
}
