//! stagecfg client CLI
//!
//! Usage:
//!   stagecfg fetch --config local.yaml
//!   stagecfg get <key> --config local.yaml [--explain]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stagecfg::{with_remote, ConfigBuilder, FetchPolicy, RemoteSource, Source};
use stagecfg_core::{EnvSource, FileSource, DEFAULT_ORDINAL};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stagecfg", version, about = "Read configuration from a stagecfg server")]
struct Cli {
    /// Local configuration file holding the config.server.* parameters
    #[arg(long, short, global = true, env = "STAGECFG_LOCAL")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the configuration set and print it as JSON
    Fetch,
    /// Resolve one key through local sources and the config server
    Get {
        key: String,
        /// Also print which source supplied the value
        #[arg(long)]
        explain: bool,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let local = local_sources(cli.config.as_deref())?;

    match cli.command {
        Command::Fetch => {
            let bootstrap = Arc::new(ConfigBuilder::new().with_sources(local).build());
            let properties = RemoteSource::new(bootstrap)
                .properties()
                .context("failed to fetch configuration")?;
            println!("{}", serde_json::to_string_pretty(&properties)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Get { key, explain } => {
            let config = with_remote(local, FetchPolicy::default());
            let value = config
                .access(&key)
                .with_context(|| format!("failed to resolve {key}"))?;
            match (value.raw(), value.source_name()) {
                (Some(raw), Some(source)) if explain => println!("{raw}\t({source})"),
                (Some(raw), _) => println!("{raw}"),
                (None, _) => {
                    eprintln!("No configured value found for config key {key}");
                    return Ok(ExitCode::from(2));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn local_sources(path: Option<&std::path::Path>) -> Result<Vec<Arc<dyn Source>>> {
    let mut sources: Vec<Arc<dyn Source>> = vec![Arc::new(EnvSource::new(""))];
    if let Some(path) = path {
        let file = FileSource::load_inferred(path, DEFAULT_ORDINAL)
            .with_context(|| format!("failed to load {}", path.display()))?;
        sources.push(Arc::new(file));
    }
    Ok(sources)
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
