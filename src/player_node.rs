//! Drives one player from login to the end of a battle.

use log::{info, warn};
use rand::rngs::SmallRng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::battle::{Battle, Outcome};
use crate::client::GameClient;
use crate::error::ServiceError;
use crate::game::{GameEngine, GameStatus};
use crate::player::Player;
use crate::stats::Statistics;

/// Identity to sign in with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password: String,
    /// Create the account instead of logging into an existing one.
    pub register: bool,
}

/// How to find an opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matchmaking {
    /// Open a game and wait for somebody to join.
    Create,
    /// Join the game opened by this player.
    Join(String),
    /// Join the first open game of somebody else.
    JoinAny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub me: String,
    pub opponent: String,
    pub outcome: Outcome,
    pub status: GameStatus,
    pub shots: usize,
}

pub struct PlayerNode {
    client: GameClient,
    player: Box<dyn Player>,
}

impl PlayerNode {
    pub fn new(client: GameClient, player: Box<dyn Player>) -> Self {
        Self { client, player }
    }

    pub fn client(&self) -> &GameClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut GameClient {
        &mut self.client
    }

    /// Log in (or register) and fetch the player's statistics.
    pub async fn sign_in(&mut self, account: &Account) -> Result<Statistics, ServiceError> {
        if account.register {
            self.client
                .register(&account.username, &account.password)
                .await?;
        } else {
            self.client.login(&account.username, &account.password).await?;
        }
        self.client.user_stat(&account.username).await
    }

    /// Find an opponent. Returns their name.
    pub async fn find_opponent(
        &mut self,
        mode: &Matchmaking,
        cancel: &CancellationToken,
    ) -> Result<String, ServiceError> {
        match mode {
            Matchmaking::Create => self.client.create_game(cancel).await,
            Matchmaking::Join(creator) => {
                self.client.join_game(creator).await?;
                Ok(creator.clone())
            }
            Matchmaking::JoinAny => {
                let me = self.client.username()?.to_string();
                let games = self.client.available_games().await?;
                let creator = games
                    .into_iter()
                    .find(|g| *g != me)
                    .ok_or(ServiceError::GameNotFound)?;
                self.client.join_game(&creator).await?;
                Ok(creator)
            }
        }
    }

    /// Find an opponent, play the battle and, when this side wins, report
    /// the result.
    pub async fn play(
        &mut self,
        rng: &mut SmallRng,
        mode: &Matchmaking,
        cancel: &CancellationToken,
    ) -> Result<GameSummary, ServiceError> {
        let opponent = self.find_opponent(mode, cancel).await?;
        let me = self.client.username()?.to_string();
        info!("{} plays {}", me, opponent);

        let mut engine = GameEngine::new();
        self.player.place_fleet(rng, &mut engine)?;
        let transport = self.client.battle_channel().await?;
        let config = *self.client.config();
        let mut battle = Battle::new(engine, transport, me.clone(), opponent.clone(), config)?;

        let outcome = tokio::select! {
            outcome = battle.run(&mut *self.player, rng) => outcome?,
            _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
        };

        if outcome == Outcome::Win {
            if let Err(e) = self.client.save_game_result(&me, &opponent).await {
                warn!("saving the result of {} vs {} failed: {}", me, opponent, e);
            }
        }
        Ok(GameSummary {
            me,
            opponent,
            outcome,
            status: battle.engine().status(),
            shots: battle.shots(),
        })
    }
}
