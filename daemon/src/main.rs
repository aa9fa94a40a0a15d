//! FaceGuard daemon: entry point for running the face-auth service.

use anyhow::Context;
use clap::Parser;
use faceguard_node::{init_logging, jobs, FaceConfig, FaceService, ShutdownController};
use faceguard_rpc::RpcServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "faceguard-daemon", about = "FaceGuard biometric authentication service")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// environment variables and CLI flags override them.
    #[arg(long, env = "FACE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the index, audit log and registries.
    #[arg(long, env = "FACE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address to bind the HTTP API to.
    #[arg(long, env = "FACE_BIND")]
    bind: Option<String>,

    /// HTTP API port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FACE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "FACE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the API server and background jobs.
    Run,
    /// Print the effective configuration as TOML and exit.
    PrintConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<FaceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            FaceConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config file {path}"))?
        }
        None => FaceConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("invalid environment override")?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(bind) = &cli.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::PrintConfig => {
            print!("{}", config.redacted().to_toml_string()?);
        }
        Command::Run => {
            init_logging(config.log_format()?, &config.log_level)
                .context("failed to install log subscriber")?;

            let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
                .parse()
                .with_context(|| format!("invalid bind address {}:{}", config.bind, config.port))?;
            tracing::info!(
                data_dir = %config.data_dir.display(),
                %addr,
                webhook = config.webhook.endpoint().unwrap_or("off"),
                "starting FaceGuard"
            );

            let service = Arc::new(FaceService::open(&config)?);
            let shutdown = Arc::new(ShutdownController::new());
            let job_handles = jobs::spawn_jobs(Arc::clone(&service), &config.jobs, &shutdown);

            let signals = Arc::clone(&shutdown);
            tokio::spawn(async move { signals.wait_for_signal().await });

            let mut server_rx = shutdown.subscribe();
            RpcServer::new(addr, service)
                .serve(async move {
                    let _ = server_rx.recv().await;
                })
                .await
                .context("API server failed")?;

            // The server may also stop on its own; make sure jobs follow.
            shutdown.shutdown();
            for handle in job_handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background job ended abnormally");
                }
            }
            tracing::info!("FaceGuard daemon exited cleanly");
        }
    }

    Ok(())
}
