use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::SmallRng, SeedableRng};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use seabattle::auth::Sha256Hasher;
use seabattle::broker::{Broker, InMemoryBroker};
use seabattle::stats::MemoryStore;
use seabattle::{
    init_logging, Account, AiPlayer, ClientConfig, GameClient, GameServer, Matchmaking, PlayerNode,
};

async fn node(broker: Arc<dyn Broker>, name: &str, config: ClientConfig) -> anyhow::Result<PlayerNode> {
    let client = GameClient::connect(broker, config).await?;
    let mut node = PlayerNode::new(client, Box::new(AiPlayer::new()));
    node.sign_in(&Account {
        username: name.to_string(),
        password: format!("{}-password", name),
        register: true,
    })
    .await?;
    Ok(node)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <seed1> <seed2>", args[0]);
        std::process::exit(1);
    }
    let seed1: u64 = args[1].parse()?;
    let seed2: u64 = args[2].parse()?;

    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
    let server = GameServer::new(
        broker.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(Sha256Hasher),
    );
    let shutdown = CancellationToken::new();
    let handle = server.start(shutdown.clone()).await?;

    let config = ClientConfig {
        ready_delay: Duration::from_millis(50),
        ready_window: Duration::from_millis(20),
        ..ClientConfig::default()
    };
    let mut p1 = node(broker.clone(), "player1", config).await?;
    let mut p2 = node(broker.clone(), "player2", ClientConfig {
        // the joiner's timer fires later, so player1 attacks first
        ready_delay: Duration::from_millis(500),
        ..config
    })
    .await?;

    let registry = server.registry();
    let cancel = CancellationToken::new();
    let creator = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut rng = SmallRng::seed_from_u64(seed1);
            let summary = p1.play(&mut rng, &Matchmaking::Create, &cancel).await;
            (p1, summary)
        })
    };
    while registry.available_games().await.is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let mut rng2 = SmallRng::seed_from_u64(seed2);
    let s2 = p2
        .play(&mut rng2, &Matchmaking::Join("player1".into()), &cancel)
        .await?;
    let (p1, s1) = creator.await?;
    let s1 = s1?;

    let stats1 = p1.client().user_stat("player1").await?;
    let stats2 = p2.client().user_stat("player2").await?;
    handle.shutdown().await;

    let winner = match (s1.outcome, s2.outcome) {
        (seabattle::Outcome::Win, seabattle::Outcome::Lose) => Some("player1"),
        (seabattle::Outcome::Lose, seabattle::Outcome::Win) => Some("player2"),
        _ => None,
    };

    let result = json!({
        "player1": {"status": format!("{:?}", s1.status), "shots": s1.shots, "rating": stats1.rating},
        "player2": {"status": format!("{:?}", s2.status), "shots": s2.shots, "rating": stats2.rating},
        "winner": winner,
    });

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
