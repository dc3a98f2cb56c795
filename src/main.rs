use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use message_board::{logging, Board, BoardConfig, BoardServer, EventBus, MemoryStore};
use tokio::net::TcpListener;

/// Real-time message board server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = BoardConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    logging::init(&config.log).context("installing tracing subscriber")?;

    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::new(config.bus.clone()));
    let board = Arc::new(Board::new(store, bus, config.mutations.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    let server = BoardServer::new(config.server.clone(), board);
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    tracing::info!(
        "HTTP ready at http://{addr}/api, subscriptions at ws://{addr}/subscriptions"
    );
    server.serve(listener).await.context("serving")?;
    Ok(())
}
