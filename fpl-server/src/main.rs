use clap::Parser;
use fpl_core::AssistantConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use fpl_server::{registry::SessionRegistry, server};

#[derive(Parser, Debug)]
#[command(author, version, about = "FPL assistant chat server", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "fpl.toml")]
    config: String,

    /// Override the socket path from the config file
    #[arg(long)]
    socket: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = match AssistantConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };
    if let Some(socket) = args.socket {
        config.service.socket_path = socket;
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    tracing::info!(
        single_flight = config.chat.single_flight,
        seeded = config.chat.rng_seed.is_some(),
        "Starting FPL assistant"
    );

    let registry = SessionRegistry::new(config.chat.clone());
    let socket_path = config.service.resolved_socket_path();
    server::run_unix_server(&socket_path, registry, tx.subscribe()).await?;

    Ok(())
}
