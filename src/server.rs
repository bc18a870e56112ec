//! The matchmaking and statistics service.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{
    AvailableGamesResponse, CreateGameResponse, Credentials, JoinGameRequest, SaveResultRequest,
    StatusResponse, UserRequest, UserStatResponse,
};
use crate::auth::{AuthService, CredentialHasher};
use crate::broker::{Broker, Delivery, Subscription, TransportError};
use crate::config::queues;
use crate::error::ServiceError;
use crate::registry::{RegistryError, ReplyAddress, SessionRegistry};
use crate::stats::{apply_game_result, StatStore};

/// Consumes the eight request queues and answers them.
///
/// Requests are handled at most once: a request that fails is answered
/// with an error and never redelivered.
pub struct GameServer {
    inner: Arc<Inner>,
}

struct Inner {
    broker: Arc<dyn Broker>,
    registry: Arc<SessionRegistry>,
    auth: AuthService,
    store: Arc<dyn StatStore>,
}

/// Running consumer tasks of a [`GameServer`].
pub struct ServerHandle {
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop consuming and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.join().await;
    }

    /// Wait until the consumers stop.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("consumer task failed: {}", e);
            }
        }
    }
}

impl GameServer {
    pub fn new(
        broker: Arc<dyn Broker>,
        store: Arc<dyn StatStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                auth: AuthService::new(store.clone(), hasher),
                broker,
                registry: Arc::new(SessionRegistry::new()),
                store,
            }),
        }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.inner.registry.clone()
    }

    /// Declare the request queues and consume each on its own task until
    /// `shutdown` fires.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<ServerHandle, ServiceError> {
        let mut tasks = Vec::with_capacity(queues::ALL.len());
        for queue in queues::ALL {
            let sub = self.inner.broker.declare(queue).await?;
            let inner = self.inner.clone();
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(consume(inner, queue, sub, shutdown)));
        }
        info!("game server consuming {} queues", tasks.len());
        Ok(ServerHandle { shutdown, tasks })
    }
}

async fn consume(
    inner: Arc<Inner>,
    queue: &'static str,
    mut sub: Subscription,
    shutdown: CancellationToken,
) {
    loop {
        let delivery = tokio::select! {
            _ = shutdown.cancelled() => break,
            d = sub.recv() => match d {
                Some(d) => d,
                None => {
                    warn!("queue {} closed", queue);
                    break;
                }
            },
        };
        inner.handle(queue, delivery).await;
    }
    debug!("consumer of {} stopped", queue);
}

fn log_failure(queue: &str, err: &ServiceError) {
    if err.is_domain() {
        info!("{} failed: {}", queue, err);
    } else {
        error!("{} failed: {}", queue, err);
    }
}

/// Errors the caller sees: domain errors as they are, the rest as internal.
fn caller_view(err: ServiceError) -> ServiceError {
    if err.is_domain() {
        err
    } else {
        ServiceError::Internal
    }
}

impl Inner {
    async fn handle(&self, queue: &'static str, d: Delivery) {
        debug!("op={} correlation={:?}", queue, d.correlation_id);
        match queue {
            queues::LOGIN => {
                let result = match self.decode::<Credentials>(queue, &d) {
                    Ok(c) => self.auth.login(&c.username, &c.password).await,
                    Err(e) => Err(e),
                };
                self.answer_status(queue, &d, result).await;
            }
            queues::REGISTER => {
                let result = match self.decode::<Credentials>(queue, &d) {
                    Ok(c) => self.auth.register(&c.username, &c.password).await,
                    Err(e) => Err(e),
                };
                self.answer_status(queue, &d, result).await;
            }
            queues::GAME_CREATE => self.create_game(&d).await,
            queues::GAME_JOIN => self.join_game(&d).await,
            queues::GAME_DEL => {
                let result = match self.decode::<UserRequest>(queue, &d) {
                    Ok(req) => {
                        if self.registry.del_game(&req.user_name).await.is_some() {
                            info!("game of {} deleted", req.user_name);
                        }
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                self.answer_status(queue, &d, result).await;
            }
            queues::GAME_AVAILABLE => {
                let games = self.registry.available_games().await;
                let resp = AvailableGamesResponse { games, error: None };
                self.reply(&d, &resp).await;
            }
            queues::GAME_SAVE_RESULT => {
                let result = match self.decode::<SaveResultRequest>(queue, &d) {
                    Ok(req) => self.save_result(&req).await,
                    Err(e) => Err(e),
                };
                self.answer_status(queue, &d, result).await;
            }
            queues::GAME_USER_STAT => {
                let result = match self.decode::<UserRequest>(queue, &d) {
                    Ok(req) => self
                        .store
                        .get_stat(&req.user_name)
                        .await
                        .map_err(ServiceError::from),
                    Err(e) => Err(e),
                };
                let resp = match result {
                    Ok(stats) => UserStatResponse::from(stats),
                    Err(e) => {
                        log_failure(queue, &e);
                        UserStatResponse {
                            error: Some(caller_view(e).wire()),
                            ..Default::default()
                        }
                    }
                };
                self.reply(&d, &resp).await;
            }
            other => warn!("no handler for queue {}", other),
        }
    }

    fn decode<T: DeserializeOwned>(&self, queue: &str, d: &Delivery) -> Result<T, ServiceError> {
        d.decode().map_err(|e| {
            debug!("malformed {} request: {}", queue, e);
            ServiceError::BadRequest
        })
    }

    async fn create_game(&self, d: &Delivery) {
        let req = match self.decode::<UserRequest>(queues::GAME_CREATE, d) {
            Ok(req) if !req.user_name.is_empty() => req,
            Ok(_) | Err(_) => {
                let resp = CreateGameResponse {
                    user2: None,
                    error: Some(ServiceError::BadRequest.wire()),
                };
                self.reply(d, &resp).await;
                return;
            }
        };
        let Some(reply_to) = d.reply_to.clone() else {
            warn!("game.create from {} without a reply queue", req.user_name);
            return;
        };
        let reply = ReplyAddress {
            queue: reply_to,
            correlation_id: d.correlation_id,
        };
        // the reply is deferred until somebody joins
        self.registry.create_game(&req.user_name, reply).await;
        info!("{} created a game", req.user_name);
    }

    async fn join_game(&self, d: &Delivery) {
        let req = match self.decode::<JoinGameRequest>(queues::GAME_JOIN, d) {
            Ok(req) => req,
            Err(e) => {
                self.answer_status(queues::GAME_JOIN, d, Err(e)).await;
                return;
            }
        };
        let joiner_reply = ReplyAddress {
            queue: d.reply_to.clone().unwrap_or_default(),
            correlation_id: d.correlation_id,
        };
        let result = match self
            .registry
            .join_game(&req.creator_user_name, &req.joining_user_name, joiner_reply)
            .await
        {
            Ok(creator_reply) => {
                info!(
                    "{} joined the game of {}",
                    req.joining_user_name, req.creator_user_name
                );
                let resp = CreateGameResponse {
                    user2: Some(req.joining_user_name.clone()),
                    error: None,
                };
                match self.send_to(&creator_reply, &resp).await {
                    Ok(()) => Ok(()),
                    Err(_) => {
                        // the creator is gone; the session cannot start
                        self.registry.del_game(&req.creator_user_name).await;
                        Err(ServiceError::GameNotFound)
                    }
                }
            }
            Err(RegistryError::NotFound) => Err(ServiceError::GameNotFound),
        };
        self.answer_status(queues::GAME_JOIN, d, result).await;
    }

    async fn save_result(&self, req: &SaveResultRequest) -> Result<(), ServiceError> {
        if req.winner.is_empty() || req.loser.is_empty() || req.winner == req.loser {
            return Err(ServiceError::BadRequest);
        }
        let mut winner = self.store.get_stat(&req.winner).await?;
        let mut loser = self.store.get_stat(&req.loser).await?;
        apply_game_result(&mut winner, &mut loser);
        self.store.update_stat(&req.winner, winner).await?;
        self.store.update_stat(&req.loser, loser).await?;
        self.registry.end_game(&req.winner, &req.loser).await;
        info!("{} beat {}: {} / {}", req.winner, req.loser, winner, loser);
        Ok(())
    }

    async fn answer_status(&self, queue: &str, d: &Delivery, result: Result<(), ServiceError>) {
        let result = result.map_err(|e| {
            log_failure(queue, &e);
            caller_view(e)
        });
        self.reply(d, &StatusResponse::from_result(result)).await;
    }

    async fn reply<T: Serialize + Sync>(&self, d: &Delivery, body: &T) {
        match &d.reply_to {
            Some(queue) => {
                let to = ReplyAddress {
                    queue: queue.clone(),
                    correlation_id: d.correlation_id,
                };
                // failures are logged by send_to
                let _ = self.send_to(&to, body).await;
            }
            None => debug!("request without reply queue; not answering"),
        }
    }

    async fn send_to<T: Serialize + Sync>(
        &self,
        to: &ReplyAddress,
        body: &T,
    ) -> Result<(), TransportError> {
        if to.queue.is_empty() {
            return Ok(());
        }
        let delivery = Delivery::json(body)
            .map_err(|e| {
                error!("encoding reply failed: {}", e);
                e
            })?
            .with_correlation(to.correlation_id);
        self.broker.publish(&to.queue, delivery).await.map_err(|e| {
            warn!("reply to {} failed: {}", to.queue, e);
            e
        })
    }
}
