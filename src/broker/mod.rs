//! Publish/subscribe queues carrying JSON deliveries.
//!
//! Every remote operation and every battle message travels as a
//! [`Delivery`] published to a named queue. A [`Broker`] implementation
//! decides where queues live: [`InMemoryBroker`] keeps them in process,
//! [`TcpBroker`] talks to a broker hosted by another process.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

pub mod in_memory;
pub mod tcp;

pub use in_memory::InMemoryBroker;
pub use tcp::{serve_broker, TcpBroker};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("queue {0} does not exist")]
    UnknownQueue(String),
    #[error("connection closed")]
    Closed,
    #[error("codec error: {0}")]
    Codec(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad frame: {0}")]
    Frame(String),
}

/// One message on a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Token the caller generated to match a reply to its request.
    pub correlation_id: Option<Uuid>,
    /// Queue the consumer should reply to.
    pub reply_to: Option<String>,
    /// JSON body.
    pub body: Vec<u8>,
}

impl Delivery {
    /// A delivery carrying `value` as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(value).map_err(|e| TransportError::Codec(e.to_string()))?;
        Ok(Delivery {
            correlation_id: None,
            reply_to: None,
            body,
        })
    }

    pub fn with_correlation(mut self, id: Option<Uuid>) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn with_reply_to(mut self, queue: impl Into<String>) -> Self {
        self.reply_to = Some(queue.into());
        self
    }

    /// Decode the JSON body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Codec(e.to_string()))
    }
}

/// Consumer end of a declared queue.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    pub fn new(name: impl Into<String>, rx: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self {
            name: name.into(),
            rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next delivery, or `None` once the queue is deleted or the broker is
    /// gone. Cancel-safe.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

/// A set of named queues.
///
/// A queue has one consumer. Declaring a queue that already exists hands the
/// queue to the new consumer; the previous subscription ends.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Declare the queue `queue` and consume it.
    async fn declare(&self, queue: &str) -> Result<Subscription, TransportError>;

    /// Declare a private queue under a generated name and consume it.
    async fn declare_exclusive(&self) -> Result<Subscription, TransportError> {
        self.declare(&format!("amq.gen-{}", Uuid::new_v4().simple()))
            .await
    }

    /// Append `delivery` to `queue`. Fails with `UnknownQueue` if nobody
    /// consumes it.
    async fn publish(&self, queue: &str, delivery: Delivery) -> Result<(), TransportError>;

    /// Remove `queue`; its subscription ends. Removing a missing queue is
    /// not an error.
    async fn delete(&self, queue: &str) -> Result<(), TransportError>;
}
