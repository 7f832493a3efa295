//! Serve command implementation
//!
//! Builds the server configuration from flags and the optional config file,
//! installs logging, and runs the edit server until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use editserver_adapters::HttpServer;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{build_server_config, load_file_config, FileConfig};
use crate::Cli;

/// Execute the serve command
pub async fn execute_serve_command(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);

    let file = match &cli.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };
    let config = build_server_config(&cli, file).context("Invalid configuration")?;

    println!("✏️  Starting edit server...");
    println!("📝 Editor: {}", config.editor);
    println!("🔌 Bind: {}", config.bind_addr);
    if !config.origin.require_origin {
        println!("⚠️  Origin restriction disabled");
    }
    println!();

    let server = HttpServer::new(config);
    server
        .run(wait_for_shutdown())
        .await
        .context("Edit server failed")?;

    info!("Edit server stopped");
    Ok(())
}

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "editserver=debug,info"
    } else {
        "editserver=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
