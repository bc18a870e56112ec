use seabattle::broker::{Broker, InMemoryBroker, TransportError};
use seabattle::client::battle_queue;
use seabattle::transport::{InMemoryTransport, QueueTransport, Transport};
use seabattle::{AttackOutcome, Message};
use std::sync::Arc;

#[tokio::test]
async fn pair_delivers_in_order_both_ways() {
    let (mut a, mut b) = InMemoryTransport::pair();
    a.send(Message::ready()).await.unwrap();
    a.send(Message::attack(3, 4)).await.unwrap();
    assert_eq!(b.recv().await.unwrap(), Message::ready());
    assert_eq!(b.recv().await.unwrap(), Message::attack(3, 4));
    b.send(Message::result(AttackOutcome::HIT)).await.unwrap();
    assert_eq!(a.recv().await.unwrap().outcome(), AttackOutcome::HIT);
}

#[tokio::test]
async fn dropped_peer_closes_the_channel() {
    let (mut a, b) = InMemoryTransport::pair();
    drop(b);
    assert!(matches!(a.recv().await, Err(TransportError::Closed)));
    assert!(matches!(a.send(Message::end()).await, Err(TransportError::Closed)));
}

#[tokio::test]
async fn queue_transport_speaks_json_over_battle_queues() {
    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
    let amy_inbox = broker.declare(&battle_queue("amy")).await.unwrap();
    let mut bob_raw = broker.declare(&battle_queue("bob")).await.unwrap();
    let mut amy = QueueTransport::new(broker.clone(), amy_inbox, battle_queue("bob"));

    amy.send(Message::attack(2, 0)).await.unwrap();
    let raw = bob_raw.recv().await.unwrap();
    assert_eq!(std::str::from_utf8(&raw.body).unwrap(), r#"{"type":1,"x":2}"#);

    let reply = seabattle::broker::Delivery::json(&Message::end()).unwrap();
    broker.publish(&battle_queue("amy"), reply).await.unwrap();
    assert_eq!(amy.recv().await.unwrap(), Message::end());
}

#[tokio::test]
async fn malformed_battle_message_is_a_codec_error() {
    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
    let inbox = broker.declare("battle.amy").await.unwrap();
    let mut amy = QueueTransport::new(broker.clone(), inbox, "battle.bob".into());
    let garbage = seabattle::broker::Delivery::json(&"not a message").unwrap();
    broker.publish("battle.amy", garbage).await.unwrap();
    assert!(matches!(amy.recv().await, Err(TransportError::Codec(_))));
}

#[tokio::test]
async fn publishing_to_a_missing_opponent_fails() {
    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
    let inbox = broker.declare("battle.amy").await.unwrap();
    let mut amy = QueueTransport::new(broker, inbox, "battle.ghost".into());
    assert!(matches!(
        amy.send(Message::ready()).await,
        Err(TransportError::UnknownQueue(_))
    ));
}
