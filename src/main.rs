use std::path::PathBuf;

use clap::Parser;

/// File depot + blind encrypted-message relay server.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Directory of downloadable files (created if missing).
    #[arg(long, default_value = "files")]
    files_dir: PathBuf,

    /// Per-client outbound queue depth.
    #[arg(long, default_value_t = 256)]
    max_send_queue: usize,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting courier server");

    std::fs::create_dir_all(&cli.files_dir).expect("Failed to create files directory");
    tracing::info!(path = %cli.files_dir.display(), "Serving files directory");

    let config = courier_server::ServerConfig {
        port: cli.port,
        files_dir: cli.files_dir,
        max_send_queue: cli.max_send_queue,
    };

    let handle = courier_server::start(config)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "courier ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}
