//! Provider Bridge Daemon
//!
//! Answers provider requests arriving over the IPC socket and pushes wallet
//! notifications to every connected page.

use anyhow::Result;
use bridge_core::storage::init_data_dir;
use bridge_daemon::{ApiHandler, ConfigManager, EventManager, IpcServer, PermissionManager, PortGate};
use clap::Parser;
use std::fs;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "bridged")]
#[command(about = "Provider bridge daemon - wallet side of the page bridge", long_about = None)]
struct Args {
    /// Socket path for IPC, overrides the config file
    #[arg(short, long)]
    socket: Option<String>,

    /// Log level, overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Origin allowed to see the selected account without asking
    #[arg(long = "allow-origin")]
    allow_origin: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let event_manager = Arc::new(EventManager::new());
    let config_manager = Arc::new(ConfigManager::new(event_manager.clone())?);

    let config = config_manager.get().await;
    let socket_path = args.socket.clone().unwrap_or(config.daemon.socket_path.clone());
    let log_level = args.log_level.clone().unwrap_or(config.daemon.log_level.clone());

    // Initialize data directory and log file
    let data_dir = init_data_dir()?;
    let log_file_path = data_dir.join("bridged.log");

    // Create log file with append mode
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    // Initialize logging - write to both file and stdout
    use tracing_subscriber::fmt::writer::MakeWriterExt;
    let stdout_writer = std::io::stdout.with_max_level(tracing::Level::INFO);
    let file_writer = log_file.with_max_level(tracing::Level::DEBUG);

    tracing_subscriber::fmt()
        .with_writer(stdout_writer.and(file_writer))
        .with_env_filter(log_level.as_str())
        .with_ansi(false) // No color codes in log file
        .init();

    tracing::info!("Provider bridge daemon starting...");
    tracing::info!("Socket path: {}", socket_path);
    tracing::info!("Log file: {}", log_file_path.display());
    tracing::info!("Chain: {}", config.chain_id);

    let permission_manager = Arc::new(PermissionManager::new());
    if let Some(account) = config.selected_account.as_deref() {
        for origin in &args.allow_origin {
            permission_manager
                .grant(origin, &config.chain_id, account)
                .await?;
            tracing::info!("Pre-approved {}", origin);
        }
    } else if !args.allow_origin.is_empty() {
        tracing::warn!("No account selected, ignoring --allow-origin");
    }

    let api_handler = Arc::new(ApiHandler::new(config_manager, permission_manager));
    let gate = Arc::new(PortGate::new(api_handler));
    tracing::info!("API handler initialized");

    // Initialize and start IPC server
    let ipc_server = Arc::new(IpcServer::new(socket_path, gate, event_manager));

    // Start IPC server in background
    let server_handle = {
        let server = ipc_server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start().await {
                tracing::error!("IPC server error: {}", e);
            }
        })
    };

    tracing::info!("Daemon ready and listening");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    server_handle.abort();
    let _ = fs::remove_file(ipc_server.socket_path());

    Ok(())
}
