//! tempokey-ai - Audio Analysis Service
//!
//! Accepts an uploaded track, estimates tempo and key, keeps results in a
//! JSON library and exports renamed copies.
//!
//! Default port: 5731

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tempokey_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use tempokey_ai::{AppState, ServiceConfig};

/// Command-line arguments for tempokey-ai
#[derive(Parser, Debug)]
#[command(name = "tempokey-ai")]
#[command(about = "Audio analysis service for tempokey")]
#[command(version)]
struct Args {
    /// Root folder holding input/, output/ and library.json
    #[arg(short, long, env = "TEMPOKEY_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML config file
    #[arg(short, long, env = "TEMPOKEY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "TEMPOKEY_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config file)
    #[arg(long, env = "TEMPOKEY_BIND")]
    bind: Option<String>,

    /// Log level (overrides config file; RUST_LOG takes precedence)
    #[arg(long, env = "TEMPOKEY_LOG_LEVEL")]
    log_level: Option<String>,
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Start at info so config loading is visible, then apply the configured level
    let (filter, filter_handle) = reload::Layer::new(env_filter("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting tempokey-ai v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml = TomlConfig::load_or_default(args.config.as_deref());
    let level = args.log_level.clone().unwrap_or_else(|| toml.logging.level.clone());
    if let Err(e) = filter_handle.reload(env_filter(&level)) {
        warn!(error = %e, "Failed to apply log level {}", level);
    }

    let root_folder = RootFolderResolver::new("tempokey-ai")
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Library: {}", initializer.library_path().display());

    let config = ServiceConfig::new(root_folder, &toml)
        .with_port(args.port)
        .with_bind_address(args.bind.clone());
    let addr = config.listen_addr()?;

    let state = AppState::new(config).await;
    let app = tempokey_ai::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
