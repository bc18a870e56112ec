//! A broker reachable over TCP.
//!
//! [`serve_broker`] exposes any [`Broker`] on a listener; [`TcpBroker`] is
//! the client half. Both ends exchange bincode [`Frame`]s, each prefixed
//! with its length as a 4-byte big-endian integer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Broker, Delivery, Subscription, TransportError};

/// Maximum frame size (1 MiB).
pub const MAX_FRAME_SIZE: u32 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Declare(String),
    DeclareExclusive,
    Publish { queue: String, delivery: Delivery },
    Delete(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fault {
    UnknownQueue(String),
    Other(String),
}

impl From<TransportError> for Fault {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::UnknownQueue(q) => Fault::UnknownQueue(q),
            other => Fault::Other(other.to_string()),
        }
    }
}

impl From<Fault> for TransportError {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::UnknownQueue(q) => TransportError::UnknownQueue(q),
            Fault::Other(msg) => TransportError::Frame(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Client to server.
    Request { id: u64, request: Request },
    /// Server to client. `Ok` carries the queue name for declarations and is
    /// empty otherwise.
    Reply { id: u64, result: Result<String, Fault> },
    /// Server to client: a delivery for a queue the client consumes.
    Deliver { queue: String, delivery: Delivery },
}

pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let data = bincode::serialize(frame).map_err(|e| TransportError::Codec(e.to_string()))?;
    if data.len() > MAX_FRAME_SIZE as usize {
        return Err(TransportError::Frame(format!(
            "frame too large: {} bytes (max: {})",
            data.len(),
            MAX_FRAME_SIZE
        )));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(&data).await?;
    Ok(())
}

/// Read one frame. A clean end of stream before the length prefix yields
/// `Ok(None)`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::Frame(format!(
            "frame too large: {} bytes (max: {})",
            len, MAX_FRAME_SIZE
        )));
    }
    if len == 0 {
        return Err(TransportError::Frame("invalid frame length: 0".into()));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    let frame = bincode::deserialize(&buf).map_err(|e| TransportError::Codec(e.to_string()))?;
    Ok(Some(frame))
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<String, Fault>>>>>;
type Consumers = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Delivery>>>>;

/// Client connection to a broker served by [`serve_broker`].
pub struct TcpBroker {
    writer: Mutex<OwnedWriteHalf>,
    pending: Pending,
    consumers: Consumers,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl TcpBroker {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    pub fn new(stream: TcpStream) -> Self {
        let (mut read_half, write_half) = stream.into_split();
        let pending: Pending = Arc::default();
        let consumers: Consumers = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));

        let reader = {
            let pending = pending.clone();
            let consumers = consumers.clone();
            let closed = closed.clone();
            tokio::spawn(async move {
                loop {
                    match read_frame(&mut read_half).await {
                        Ok(Some(Frame::Reply { id, result })) => {
                            if let Some(tx) = pending.lock().await.remove(&id) {
                                let _ = tx.send(result);
                            }
                        }
                        Ok(Some(Frame::Deliver { queue, delivery })) => {
                            let mut consumers = consumers.lock().await;
                            let delivered = consumers
                                .get(&queue)
                                .map(|tx| tx.send(delivery).is_ok())
                                .unwrap_or(false);
                            if !delivered {
                                debug!("dropping delivery for unconsumed queue {}", queue);
                                consumers.remove(&queue);
                            }
                        }
                        Ok(Some(Frame::Request { .. })) => {
                            warn!("broker sent a request frame; ignoring");
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("broker connection failed: {}", e);
                            break;
                        }
                    }
                }
                // waking every caller with a closed channel
                let mut pending = pending.lock().await;
                closed.store(true, Ordering::SeqCst);
                pending.clear();
                drop(pending);
                consumers.lock().await.clear();
            })
        };

        Self {
            writer: Mutex::new(write_half),
            pending,
            consumers,
            closed,
            next_id: AtomicU64::new(1),
            reader,
        }
    }

    async fn request(&self, request: Request) -> Result<String, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }
            pending.insert(id, tx);
        }
        let sent = {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &Frame::Request { id, request }).await
        };
        if let Err(e) = sent {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }
        match rx.await {
            Ok(result) => result.map_err(TransportError::from),
            Err(_) => Err(TransportError::Closed),
        }
    }
}

impl Drop for TcpBroker {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl Broker for TcpBroker {
    async fn declare(&self, queue: &str) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.consumers.lock().await.insert(queue.to_string(), tx);
        if let Err(e) = self.request(Request::Declare(queue.to_string())).await {
            self.consumers.lock().await.remove(queue);
            return Err(e);
        }
        Ok(Subscription::new(queue, rx))
    }

    async fn declare_exclusive(&self) -> Result<Subscription, TransportError> {
        let name = self.request(Request::DeclareExclusive).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.consumers.lock().await.insert(name.clone(), tx);
        Ok(Subscription::new(name, rx))
    }

    async fn publish(&self, queue: &str, delivery: Delivery) -> Result<(), TransportError> {
        self.request(Request::Publish {
            queue: queue.to_string(),
            delivery,
        })
        .await
        .map(|_| ())
    }

    async fn delete(&self, queue: &str) -> Result<(), TransportError> {
        self.consumers.lock().await.remove(queue);
        self.request(Request::Delete(queue.to_string()))
            .await
            .map(|_| ())
    }
}

/// Accept connections on `listener` and serve `broker` to each until
/// `shutdown` fires.
pub async fn serve_broker(
    listener: TcpListener,
    broker: Arc<dyn Broker>,
    shutdown: CancellationToken,
) -> Result<(), TransportError> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!("broker client connected from {}", peer);
                let broker = broker.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, broker, shutdown).await {
                        warn!("broker client {} failed: {}", peer, e);
                    }
                    info!("broker client {} disconnected", peer);
                });
            }
        }
    }
    Ok(())
}

async fn serve_connection(
    stream: TcpStream,
    broker: Arc<dyn Broker>,
    shutdown: CancellationToken,
) -> Result<(), TransportError> {
    let (mut read_half, mut write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Frame>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = write_frame(&mut write_half, &frame).await {
                debug!("broker write failed: {}", e);
                break;
            }
        }
    });

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();
    let mut owned: Vec<String> = Vec::new();

    let result = loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            frame = read_frame(&mut read_half) => frame,
        };
        let (id, request) = match frame {
            Ok(Some(Frame::Request { id, request })) => (id, request),
            Ok(Some(other)) => break Err(TransportError::Frame(format!("unexpected frame {:?}", other))),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };

        let result = match request {
            Request::Declare(queue) => broker.declare(&queue).await,
            Request::DeclareExclusive => broker.declare_exclusive().await,
            Request::Publish { queue, delivery } => {
                let published = broker.publish(&queue, delivery).await;
                let _ = out_tx.send(Frame::Reply {
                    id,
                    result: published.map(|()| String::new()).map_err(Fault::from),
                });
                continue;
            }
            Request::Delete(queue) => {
                owned.retain(|q| q != &queue);
                let deleted = broker.delete(&queue).await;
                let _ = out_tx.send(Frame::Reply {
                    id,
                    result: deleted.map(|()| String::new()).map_err(Fault::from),
                });
                continue;
            }
        };

        let reply = match result {
            Ok(mut sub) => {
                let name = sub.name().to_string();
                owned.push(name.clone());
                let out = out_tx.clone();
                let queue = name.clone();
                forwarders.push(tokio::spawn(async move {
                    while let Some(delivery) = sub.recv().await {
                        let frame = Frame::Deliver {
                            queue: queue.clone(),
                            delivery,
                        };
                        if out.send(frame).is_err() {
                            break;
                        }
                    }
                }));
                Ok(name)
            }
            Err(e) => Err(Fault::from(e)),
        };
        let _ = out_tx.send(Frame::Reply { id, result: reply });
    };

    for forwarder in forwarders {
        forwarder.abort();
    }
    // queues consumed by a departed client are gone with it
    for queue in owned {
        let _ = broker.delete(&queue).await;
    }
    drop(out_tx);
    let _ = writer.await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_survive_the_length_prefix() {
        let frame = Frame::Request {
            id: 7,
            request: Request::Publish {
                queue: "game.create".into(),
                delivery: Delivery::json(&"x").unwrap(),
            },
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();
        assert_eq!(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize, buf.len() - 4);
        let mut slice = buf.as_slice();
        assert_eq!(read_frame(&mut slice).await.unwrap(), Some(frame));
        assert_eq!(read_frame(&mut slice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_and_empty_frames_are_rejected() {
        let mut big = (MAX_FRAME_SIZE + 1).to_be_bytes().to_vec();
        big.extend_from_slice(&[0; 8]);
        assert!(matches!(
            read_frame(&mut big.as_slice()).await,
            Err(TransportError::Frame(_))
        ));
        let empty = 0u32.to_be_bytes();
        assert!(matches!(
            read_frame(&mut empty.as_slice()).await,
            Err(TransportError::Frame(_))
        ));
    }
}
