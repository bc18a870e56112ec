use std::sync::Arc;
use std::time::Duration;

use seabattle::broker::tcp::{read_frame, write_frame, Frame, Request};
use seabattle::broker::{serve_broker, Broker, Delivery, InMemoryBroker, TcpBroker, TransportError};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

async fn start() -> (Arc<InMemoryBroker>, std::net::SocketAddr, CancellationToken) {
    let broker = Arc::new(InMemoryBroker::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(serve_broker(listener, broker.clone(), shutdown.clone()));
    (broker, addr, shutdown)
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_clients_exchange_deliveries() {
    let (_local, addr, shutdown) = start().await;
    let amy = TcpBroker::connect(addr).await.unwrap();
    let bob = TcpBroker::connect(addr).await.unwrap();

    let mut inbox = amy.declare("battle.amy").await.unwrap();
    let reply = bob.declare_exclusive().await.unwrap();
    assert!(reply.name().starts_with("amq.gen-"));

    let d = Delivery::json(&"hi").unwrap().with_reply_to(reply.name());
    bob.publish("battle.amy", d).await.unwrap();
    let got = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.decode::<String>().unwrap(), "hi");
    assert_eq!(got.reply_to.as_deref(), Some(reply.name()));
    shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_queue_survives_the_wire() {
    let (_local, addr, shutdown) = start().await;
    let amy = TcpBroker::connect(addr).await.unwrap();
    let err = amy.publish("nobody", Delivery::json(&1).unwrap()).await;
    assert!(matches!(err, Err(TransportError::UnknownQueue(q)) if q == "nobody"));
    shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn departed_client_takes_its_queues_along() {
    let (local, addr, shutdown) = start().await;
    let amy = TcpBroker::connect(addr).await.unwrap();
    let _inbox = amy.declare("battle.amy").await.unwrap();
    assert_eq!(local.queue_names().await, vec!["battle.amy".to_string()]);
    drop(amy);
    let mut gone = false;
    for _ in 0..100 {
        if local.queue_names().await.is_empty() {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(gone);
    shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn raw_frames_get_replies() {
    let (_local, addr, shutdown) = start().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    write_frame(
        &mut stream,
        &Frame::Request {
            id: 42,
            request: Request::Declare("q".into()),
        },
    )
    .await
    .unwrap();
    let reply = read_frame(&mut stream).await.unwrap();
    assert_eq!(
        reply,
        Some(Frame::Reply {
            id: 42,
            result: Ok("q".into())
        })
    );
    shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_frame_drops_the_connection() {
    let (_local, addr, shutdown) = start().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).await.unwrap();
    stream.flush().await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), read_frame(&mut stream))
        .await
        .unwrap();
    assert!(matches!(next, Ok(None) | Err(_)));
    shutdown.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_server_fails_pending_calls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // accept and hang up without answering
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
    });
    let amy = TcpBroker::connect(addr).await.unwrap();
    let err = tokio::time::timeout(Duration::from_secs(5), amy.declare("q"))
        .await
        .unwrap();
    assert!(err.is_err());
}
