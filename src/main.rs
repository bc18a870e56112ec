use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

use seabattle::broker::TcpBroker;
use seabattle::{
    init_logging, Account, AiPlayer, CliPlayer, ClientConfig, GameClient, Matchmaking, Outcome,
    Player, PlayerNode,
};

#[derive(Parser)]
#[command(author, version, about = "Two-player sea battle client", long_about = None)]
struct Cli {
    /// Address of the game server's broker.
    #[arg(long, env = "SEABATTLE_BROKER", default_value = "127.0.0.1:5672")]
    broker: String,
    #[arg(long, short)]
    username: String,
    #[arg(long, short, env = "SEABATTLE_PASSWORD")]
    password: String,
    /// Create the account before signing in.
    #[arg(long)]
    register: bool,
    /// Seconds to wait for an opponent after creating a game.
    #[arg(long, env = "SEABATTLE_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PlayerType {
    Human,
    Ai,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a game and wait for an opponent.
    Create {
        #[arg(long, value_enum, default_value_t = PlayerType::Human)]
        player: PlayerType,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Join a game. Without a creator, joins the first open game.
    Join {
        creator: Option<String>,
        #[arg(long, value_enum, default_value_t = PlayerType::Human)]
        player: PlayerType,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// List games waiting for an opponent.
    Games,
    /// Show the statistics of a player (yourself by default).
    Stats { user: Option<String> },
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => {
            println!("Using fixed seed: {} (game will be reproducible)", s);
            SmallRng::seed_from_u64(s)
        }
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

fn make_player(kind: PlayerType) -> Box<dyn Player> {
    match kind {
        PlayerType::Human => Box::new(CliPlayer::stdio()),
        PlayerType::Ai => Box::new(AiPlayer::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = ClientConfig {
        matchmaking_timeout: Duration::from_secs(cli.timeout_secs),
        ..ClientConfig::default()
    };
    let broker = Arc::new(TcpBroker::connect(cli.broker.as_str()).await?);
    info!("connected to broker at {}", cli.broker);
    let client = GameClient::connect(broker, config).await?;

    let (player, seed, mode) = match &cli.command {
        Commands::Create { player, seed } => (*player, *seed, Matchmaking::Create),
        Commands::Join {
            creator,
            player,
            seed,
        } => (
            *player,
            *seed,
            creator
                .clone()
                .map(Matchmaking::Join)
                .unwrap_or(Matchmaking::JoinAny),
        ),
        Commands::Games | Commands::Stats { .. } => (PlayerType::Ai, None, Matchmaking::JoinAny),
    };

    let mut node = PlayerNode::new(client, make_player(player));
    let account = Account {
        username: cli.username.clone(),
        password: cli.password,
        register: cli.register,
    };
    let stats = node.sign_in(&account).await?;
    println!("{}: {}", cli.username, stats);

    match &cli.command {
        Commands::Games => {
            let games = node.client().available_games().await?;
            if games.is_empty() {
                println!("No open games");
            }
            for game in games {
                println!("{}", game);
            }
            return Ok(());
        }
        Commands::Stats { user } => {
            if let Some(user) = user {
                println!("{}: {}", user, node.client().user_stat(user).await?);
            }
            return Ok(());
        }
        Commands::Create { .. } | Commands::Join { .. } => {}
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut rng = make_rng(seed);
    if mode == Matchmaking::Create {
        println!("Waiting for an opponent...");
    }
    let summary = node.play(&mut rng, &mode, &cancel).await?;
    println!(
        "{} after {} shots against {}",
        match summary.outcome {
            Outcome::Win => "Victory",
            Outcome::Lose => "Defeat",
        },
        summary.shots,
        summary.opponent
    );
    println!("{}: {}", cli.username, node.client().user_stat(&cli.username).await?);
    Ok(())
}
