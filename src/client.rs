//! Client side of the request/reply operations.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::api::{
    AvailableGamesRequest, AvailableGamesResponse, CreateGameResponse, Credentials,
    JoinGameRequest, SaveResultRequest, StatusResponse, UserRequest, UserStatResponse,
};
use crate::broker::{Broker, Subscription};
use crate::config::{queues, ClientConfig};
use crate::error::ServiceError;
use crate::rpc::RpcClient;
use crate::stats::Statistics;
use crate::transport::QueueTransport;

/// Battle queue of `username`.
pub fn battle_queue(username: &str) -> String {
    format!("{}{}", queues::BATTLE_PREFIX, username)
}

/// One logged-in player's view of the game service.
pub struct GameClient {
    rpc: RpcClient,
    config: ClientConfig,
    username: Option<String>,
    opponent: Option<String>,
    inbox: Option<Subscription>,
}

impl GameClient {
    pub async fn connect(broker: Arc<dyn Broker>, config: ClientConfig) -> Result<Self, ServiceError> {
        let rpc = RpcClient::connect(broker, config.call_timeout).await?;
        Ok(Self {
            rpc,
            config,
            username: None,
            opponent: None,
            inbox: None,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn username(&self) -> Result<&str, ServiceError> {
        self.username.as_deref().ok_or(ServiceError::NotLoggedIn)
    }

    /// Opponent of the last successful matchmaking.
    pub fn opponent_name(&self) -> Result<&str, ServiceError> {
        self.opponent.as_deref().ok_or(ServiceError::NoOpponent)
    }

    pub async fn register(&mut self, username: &str, password: &str) -> Result<(), ServiceError> {
        self.authenticate(queues::REGISTER, username, password).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ServiceError> {
        self.authenticate(queues::LOGIN, username, password).await
    }

    async fn authenticate(
        &mut self,
        queue: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ServiceError> {
        let req = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let _: StatusResponse = self.rpc.call(queue, &req).await?;
        self.username = Some(username.to_string());
        Ok(())
    }

    /// Open a game and wait for an opponent. Returns the opponent's name.
    ///
    /// On any failure, timeout and cancellation included, the session and
    /// the battle queue are deleted before the error is returned.
    pub async fn create_game(&mut self, cancel: &CancellationToken) -> Result<String, ServiceError> {
        let me = self.username()?.to_string();
        self.prepare_inbox(&me).await?;
        let req = UserRequest {
            user_name: me.clone(),
        };
        info!("{} waiting for an opponent", me);
        let resp: Result<CreateGameResponse, _> = self
            .rpc
            .call_until(
                queues::GAME_CREATE,
                &req,
                self.config.matchmaking_timeout,
                cancel,
            )
            .await;
        match resp {
            Ok(CreateGameResponse {
                user2: Some(opponent),
                ..
            }) if !opponent.is_empty() => {
                info!("{} joined the game of {}", opponent, me);
                self.opponent = Some(opponent.clone());
                Ok(opponent)
            }
            Ok(_) => {
                self.abandon_game(&me).await;
                Err(ServiceError::NoOpponent)
            }
            Err(e) => {
                self.abandon_game(&me).await;
                Err(e)
            }
        }
    }

    async fn abandon_game(&mut self, me: &str) {
        if let Err(e) = self.del_game().await {
            warn!("deleting abandoned game of {} failed: {}", me, e);
        }
        // a joiner that slipped in now fails to publish instead of waiting
        self.inbox = None;
        if let Err(e) = self.rpc.broker().delete(&battle_queue(me)).await {
            debug!("deleting battle queue of {} failed: {}", me, e);
        }
    }

    /// Join the game opened by `creator`.
    pub async fn join_game(&mut self, creator: &str) -> Result<(), ServiceError> {
        let me = self.username()?.to_string();
        self.prepare_inbox(&me).await?;
        let req = JoinGameRequest {
            creator_user_name: creator.to_string(),
            joining_user_name: me,
        };
        let _: StatusResponse = self.rpc.call(queues::GAME_JOIN, &req).await?;
        self.opponent = Some(creator.to_string());
        Ok(())
    }

    /// Delete this player's open game. Deleting nothing succeeds.
    pub async fn del_game(&self) -> Result<(), ServiceError> {
        let req = UserRequest {
            user_name: self.username()?.to_string(),
        };
        let _: StatusResponse = self.rpc.call(queues::GAME_DEL, &req).await?;
        Ok(())
    }

    pub async fn available_games(&self) -> Result<Vec<String>, ServiceError> {
        let resp: AvailableGamesResponse = self
            .rpc
            .call(queues::GAME_AVAILABLE, &AvailableGamesRequest::default())
            .await?;
        Ok(resp.games)
    }

    pub async fn save_game_result(&self, winner: &str, loser: &str) -> Result<(), ServiceError> {
        let req = SaveResultRequest {
            winner: winner.to_string(),
            loser: loser.to_string(),
        };
        let _: StatusResponse = self.rpc.call(queues::GAME_SAVE_RESULT, &req).await?;
        Ok(())
    }

    pub async fn user_stat(&self, username: &str) -> Result<Statistics, ServiceError> {
        let req = UserRequest {
            user_name: username.to_string(),
        };
        let resp: UserStatResponse = self.rpc.call(queues::GAME_USER_STAT, &req).await?;
        Ok(Statistics::from(&resp))
    }

    /// Battle channel to the current opponent.
    pub async fn battle_channel(&mut self) -> Result<QueueTransport, ServiceError> {
        let me = self.username()?.to_string();
        let opponent = self.opponent_name()?.to_string();
        let inbox = match self.inbox.take() {
            Some(inbox) => inbox,
            None => self.rpc.broker().declare(&battle_queue(&me)).await?,
        };
        Ok(QueueTransport::new(
            self.rpc.broker().clone(),
            inbox,
            battle_queue(&opponent),
        ))
    }

    // The battle queue exists before matchmaking completes so that an early
    // Ready from the opponent is never lost.
    async fn prepare_inbox(&mut self, me: &str) -> Result<(), ServiceError> {
        self.inbox = Some(self.rpc.broker().declare(&battle_queue(me)).await?);
        Ok(())
    }
}
