use std::sync::Arc;
use std::time::Duration;

use seabattle::api::{StatusResponse, UserStatResponse};
use seabattle::auth::Sha256Hasher;
use seabattle::broker::{Broker, Delivery, InMemoryBroker, TransportError};
use seabattle::client::battle_queue;
use seabattle::registry::{ReplyAddress, SessionStatus};
use seabattle::rpc::RpcClient;
use seabattle::stats::{MemoryStore, StatStore, Statistics};
use seabattle::{queues, ClientConfig, GameClient, GameServer, Message, ServerHandle, ServiceError};
use tokio_util::sync::CancellationToken;

struct Harness {
    broker: Arc<dyn Broker>,
    server: GameServer,
    store: Arc<MemoryStore>,
    handle: ServerHandle,
}

async fn harness() -> Harness {
    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
    let store = Arc::new(MemoryStore::new());
    let server = GameServer::new(broker.clone(), store.clone(), Arc::new(Sha256Hasher));
    let handle = server.start(CancellationToken::new()).await.unwrap();
    Harness {
        broker,
        server,
        store,
        handle,
    }
}

fn config() -> ClientConfig {
    ClientConfig {
        call_timeout: Duration::from_secs(5),
        matchmaking_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    }
}

async fn registered(h: &Harness, name: &str) -> GameClient {
    let mut client = GameClient::connect(h.broker.clone(), config()).await.unwrap();
    client.register(name, "pw").await.unwrap();
    client
}

async fn wait_for_game(h: &Harness, creator: &str) {
    let registry = h.server.registry();
    for _ in 0..500 {
        if registry.available_games().await.iter().any(|g| g == creator) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("{} never opened a game", creator);
}

#[tokio::test]
async fn register_and_login() {
    let h = harness().await;
    let mut amy = registered(&h, "amy").await;
    assert_eq!(amy.username().unwrap(), "amy");
    assert_eq!(amy.register("amy", "pw").await, Err(ServiceError::UserExists));
    amy.login("amy", "pw").await.unwrap();
    assert_eq!(amy.login("amy", "nope").await, Err(ServiceError::WrongPassword));
    assert_eq!(amy.login("ghost", "pw").await, Err(ServiceError::UserNotFound));
    assert_eq!(amy.user_stat("amy").await.unwrap(), Statistics::default());
    h.handle.shutdown().await;
}

#[tokio::test]
async fn create_and_join_tell_both_sides_the_opponent() {
    let h = harness().await;
    let mut amy = registered(&h, "amy").await;
    let mut bob = registered(&h, "bob").await;

    let waiting = tokio::spawn(async move {
        let opponent = amy.create_game(&CancellationToken::new()).await;
        (amy, opponent)
    });
    wait_for_game(&h, "amy").await;
    assert_eq!(bob.available_games().await.unwrap(), vec!["amy".to_string()]);

    bob.join_game("amy").await.unwrap();
    assert_eq!(bob.opponent_name().unwrap(), "amy");
    let (amy, opponent) = waiting.await.unwrap();
    assert_eq!(opponent.unwrap(), "bob");
    assert_eq!(amy.opponent_name().unwrap(), "bob");

    let session = h.server.registry().session("amy").await.unwrap();
    assert_eq!(session.status, SessionStatus::InProgress);
    assert_eq!(session.joiner.as_deref(), Some("bob"));
    assert!(bob.available_games().await.unwrap().is_empty());
    h.handle.shutdown().await;
}

#[tokio::test]
async fn joining_a_missing_or_taken_game_fails() {
    let h = harness().await;
    let mut bob = registered(&h, "bob").await;
    assert_eq!(bob.join_game("amy").await, Err(ServiceError::GameNotFound));
    assert_eq!(bob.opponent_name(), Err(ServiceError::NoOpponent));

    let mut amy = registered(&h, "amy").await;
    let mut cat = registered(&h, "cat").await;
    let waiting = tokio::spawn(async move { amy.create_game(&CancellationToken::new()).await });
    wait_for_game(&h, "amy").await;
    bob.join_game("amy").await.unwrap();
    assert_eq!(cat.join_game("amy").await, Err(ServiceError::GameNotFound));
    assert_eq!(waiting.await.unwrap().unwrap(), "bob");
    h.handle.shutdown().await;
}

#[tokio::test]
async fn cannot_join_own_game() {
    let h = harness().await;
    let mut amy = registered(&h, "amy").await;
    let mut amy_again = GameClient::connect(h.broker.clone(), config()).await.unwrap();
    amy_again.login("amy", "pw").await.unwrap();
    let cancel = CancellationToken::new();
    let waiting = {
        let cancel = cancel.clone();
        tokio::spawn(async move { amy.create_game(&cancel).await })
    };
    wait_for_game(&h, "amy").await;
    assert_eq!(amy_again.join_game("amy").await, Err(ServiceError::GameNotFound));
    cancel.cancel();
    assert_eq!(waiting.await.unwrap(), Err(ServiceError::Cancelled));
    h.handle.shutdown().await;
}

#[tokio::test]
async fn matchmaking_timeout_deletes_the_session() {
    let h = harness().await;
    let mut amy = GameClient::connect(
        h.broker.clone(),
        ClientConfig {
            matchmaking_timeout: Duration::from_millis(50),
            ..config()
        },
    )
    .await
    .unwrap();
    amy.register("amy", "pw").await.unwrap();
    assert_eq!(
        amy.create_game(&CancellationToken::new()).await,
        Err(ServiceError::Timeout)
    );
    assert!(h.server.registry().session("amy").await.is_none());
    assert!(amy.available_games().await.unwrap().is_empty());
    h.handle.shutdown().await;
}

#[tokio::test]
async fn cancelled_matchmaking_deletes_the_session() {
    let h = harness().await;
    let mut amy = registered(&h, "amy").await;
    let cancel = CancellationToken::new();
    let waiting = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let r = amy.create_game(&cancel).await;
            (amy, r)
        })
    };
    wait_for_game(&h, "amy").await;
    cancel.cancel();
    let (amy, result) = waiting.await.unwrap();
    assert_eq!(result, Err(ServiceError::Cancelled));
    assert!(h.server.registry().is_empty().await);
    // deleting again is harmless
    amy.del_game().await.unwrap();
    h.handle.shutdown().await;
}

#[tokio::test]
async fn create_reply_without_opponent_abandons_the_game() {
    let h = harness().await;
    let mut amy = registered(&h, "amy").await;
    h.server
        .registry()
        .create_game(
            "amy",
            ReplyAddress {
                queue: String::new(),
                correlation_id: None,
            },
        )
        .await;
    // game.create answered by a service that never names an opponent
    let mut create = h.broker.declare(queues::GAME_CREATE).await.unwrap();
    let broker = h.broker.clone();
    tokio::spawn(async move {
        while let Some(d) = create.recv().await {
            if let Some(to) = d.reply_to.clone() {
                let reply = Delivery {
                    correlation_id: d.correlation_id,
                    reply_to: None,
                    body: b"{}".to_vec(),
                };
                let _ = broker.publish(&to, reply).await;
            }
        }
    });

    assert_eq!(
        amy.create_game(&CancellationToken::new()).await,
        Err(ServiceError::NoOpponent)
    );
    assert!(h.server.registry().is_empty().await);
    let late_ready = Delivery::json(&Message::ready()).unwrap();
    assert!(matches!(
        h.broker.publish(&battle_queue("amy"), late_ready).await,
        Err(TransportError::UnknownQueue(_))
    ));
    h.handle.shutdown().await;
}

#[tokio::test]
async fn timed_out_creator_leaves_no_battle_queue() {
    let h = harness().await;
    let mut amy = GameClient::connect(
        h.broker.clone(),
        ClientConfig {
            matchmaking_timeout: Duration::from_millis(30),
            ..config()
        },
    )
    .await
    .unwrap();
    amy.register("amy", "pw").await.unwrap();
    assert_eq!(
        amy.create_game(&CancellationToken::new()).await,
        Err(ServiceError::Timeout)
    );
    let attack = Delivery::json(&Message::attack(1, 1)).unwrap();
    assert!(h.broker.publish(&battle_queue("amy"), attack).await.is_err());
    h.handle.shutdown().await;
}

#[tokio::test]
async fn joining_a_vanished_creator_fails_and_clears_the_game() {
    let h = harness().await;
    let mut bob = registered(&h, "bob").await;
    h.server
        .registry()
        .create_game(
            "amy",
            ReplyAddress {
                queue: "amq.gen-gone".into(),
                correlation_id: None,
            },
        )
        .await;
    assert_eq!(bob.join_game("amy").await, Err(ServiceError::GameNotFound));
    assert!(h.server.registry().session("amy").await.is_none());
    h.handle.shutdown().await;
}

#[tokio::test]
async fn saved_result_moves_ratings() {
    let h = harness().await;
    let amy = registered(&h, "amy").await;
    let _bob = registered(&h, "bob").await;
    h.store
        .update_stat("amy", Statistics { wins: 0, losses: 0, rating: 100 })
        .await
        .unwrap();
    h.store
        .update_stat("bob", Statistics { wins: 0, losses: 0, rating: 50 })
        .await
        .unwrap();

    amy.save_game_result("amy", "bob").await.unwrap();
    assert_eq!(
        amy.user_stat("amy").await.unwrap(),
        Statistics { wins: 1, losses: 0, rating: 105 }
    );
    assert_eq!(
        amy.user_stat("bob").await.unwrap(),
        Statistics { wins: 0, losses: 1, rating: 40 }
    );
    assert_eq!(
        amy.save_game_result("amy", "ghost").await,
        Err(ServiceError::UserNotFound)
    );
    h.handle.shutdown().await;
}

#[tokio::test]
async fn malformed_requests_get_bad_request() {
    let h = harness().await;
    let rpc = RpcClient::connect(h.broker.clone(), Duration::from_secs(5)).await.unwrap();
    let err = rpc
        .call::<_, StatusResponse>("auth.login", &"just a string")
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::BadRequest);
    let err = rpc
        .call::<_, UserStatResponse>("game.get_user_stat", &42)
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::BadRequest);
    h.handle.shutdown().await;
}

#[tokio::test]
async fn requests_without_reply_queue_are_dropped() {
    let h = harness().await;
    let body = Delivery::json(&serde_json::json!({"username": "amy", "password": "pw"})).unwrap();
    h.broker.publish("auth.register", body).await.unwrap();
    // the registration itself still happens
    for _ in 0..500 {
        if h.store.get_stat("amy").await.is_ok() {
            h.handle.shutdown().await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("registration was not processed");
}

#[tokio::test]
async fn calls_before_login_are_refused_locally() {
    let h = harness().await;
    let mut anon = GameClient::connect(h.broker.clone(), config()).await.unwrap();
    assert_eq!(
        anon.create_game(&CancellationToken::new()).await,
        Err(ServiceError::NotLoggedIn)
    );
    assert_eq!(anon.del_game().await, Err(ServiceError::NotLoggedIn));
    h.handle.shutdown().await;
}
