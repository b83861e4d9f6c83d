//! stagecfg-server entrypoint
//!
//! Usage:
//!   stagecfg-server --config server.yaml [--bind 0.0.0.0:8080] [--log-format json]
//!   stagecfg-server keygen

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stagecfg_protocol::{compute_key_fingerprint, encode_signing_key, encode_verifying_key, generate_keypair};
use stagecfg_server::{build_router, endpoint_from_settings, http, init_tracing, LogFormat, ServerSettings};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "stagecfg-server", version, about = "Serve staged configuration as signed tokens")]
struct Cli {
    /// Settings file (yaml, properties or toml)
    #[arg(long, short, env = "STAGECFG_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `bind` from the settings
    #[arg(long)]
    bind: Option<SocketAddr>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a new signing key and its verifying key
    Keygen,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Keygen) = cli.command {
        let key = generate_keypair();
        let verifying = key.verifying_key();
        println!("signingKey: {}", encode_signing_key(&key));
        println!("publicKey: {}", encode_verifying_key(&verifying));
        println!("fingerprint: {}", compute_key_fingerprint(&verifying));
        return Ok(());
    }

    init_tracing(cli.log_format).context("failed to initialise logging")?;

    let mut settings =
        ServerSettings::load(cli.config.as_deref()).context("failed to load server settings")?;
    if let Some(bind) = cli.bind {
        settings.bind = bind;
    }
    info!(
        applications = ?settings.applications,
        root = %settings.root_directory.display(),
        "loaded settings"
    );

    let endpoint = endpoint_from_settings(&settings).context("invalid signingKey")?;
    let router = build_router(Arc::new(endpoint));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(settings.bind)
            .await
            .with_context(|| format!("failed to bind {}", settings.bind))?;
        http::serve(listener, router, http::shutdown_signal())
            .await
            .context("server error")
    })
}
