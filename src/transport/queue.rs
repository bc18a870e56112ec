use std::sync::Arc;

use log::trace;

use crate::broker::{Broker, Delivery, Subscription, TransportError};
use crate::protocol::Message;
use crate::transport::Transport;

/// Battle channel over two broker queues: this player consumes its own
/// queue and publishes to the opponent's.
pub struct QueueTransport {
    broker: Arc<dyn Broker>,
    inbox: Subscription,
    peer: String,
}

impl QueueTransport {
    pub fn new(broker: Arc<dyn Broker>, inbox: Subscription, peer: String) -> Self {
        Self {
            broker,
            inbox,
            peer,
        }
    }

    pub fn inbox(&self) -> &str {
        self.inbox.name()
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

#[async_trait::async_trait]
impl Transport for QueueTransport {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        trace!("{} -> {}: {:?}", self.inbox.name(), self.peer, msg);
        self.broker.publish(&self.peer, Delivery::json(&msg)?).await
    }

    async fn recv(&mut self) -> Result<Message, TransportError> {
        let delivery = self.inbox.recv().await.ok_or(TransportError::Closed)?;
        delivery.decode()
    }
}
