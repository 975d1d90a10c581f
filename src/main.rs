//! Metering Agent Binary Entry Point
//!
//! Loads a YAML configuration, builds the agent and runs it in the configured
//! run mode. Core functionality is provided by the `metering_agent` library crate.

use std::path::PathBuf;

use clap::Parser;
use metering_agent::{Agent, AppConfig, TypeRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Metering Agent - polls metric sources and publishes them to sinks
#[derive(Parser, Debug)]
#[command(name = "metering-agent", version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(env = "METERING_AGENT_CONFIG")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Usage errors exit with 1; --help and --version exit normally
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprint!("{}", e.render());
            std::process::exit(1);
        }
    };

    // Logs go to stderr so stdout carries only published output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,metering_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(config = %cli.config.display(), "Loading configuration");
    let config = AppConfig::load(&cli.config)
        .inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?
        .config;

    let plugin_dir = config
        .plugin_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut registry = TypeRegistry::new(plugin_dir);
    let mut agent = Agent::from_config(&config, &mut registry)
        .inspect_err(|e| tracing::error!(error = %e, "Failed to build agent"))?;

    tokio::select! {
        _ = agent.run() => {}
        _ = shutdown_signal() => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
