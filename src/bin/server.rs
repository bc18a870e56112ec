use std::sync::Arc;

use clap::Parser;
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use seabattle::auth::Sha256Hasher;
use seabattle::broker::{serve_broker, Broker, InMemoryBroker};
use seabattle::stats::MemoryStore;
use seabattle::{init_logging, GameServer, ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "Sea battle matchmaking server", long_about = None)]
struct Cli {
    /// Address the broker listens on.
    #[arg(long, env = "SEABATTLE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = ServerConfig {
        bind: cli.bind.unwrap_or_else(|| ServerConfig::default().bind),
    };

    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
    let server = GameServer::new(
        broker.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(Sha256Hasher),
    );
    let shutdown = CancellationToken::new();
    let handle = server.start(shutdown.clone()).await?;

    let listener = TcpListener::bind(&config.bind).await?;
    info!("listening on {}", listener.local_addr()?);
    let serving = tokio::spawn(serve_broker(listener, broker, shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    shutdown.cancel();
    handle.join().await;
    serving.await??;
    Ok(())
}
