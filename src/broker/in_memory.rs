use std::collections::HashMap;

use async_trait::async_trait;
use log::trace;
use tokio::sync::{mpsc, RwLock};

use super::{Broker, Delivery, Subscription, TransportError};

/// Queues held in process, one unbounded channel per queue.
#[derive(Default)]
pub struct InMemoryBroker {
    queues: RwLock<HashMap<String, mpsc::UnboundedSender<Delivery>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all declared queues, sorted.
    pub async fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn declare(&self, queue: &str) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queues.write().await.insert(queue.to_string(), tx);
        trace!("declared queue {}", queue);
        Ok(Subscription::new(queue, rx))
    }

    async fn publish(&self, queue: &str, delivery: Delivery) -> Result<(), TransportError> {
        let sent = match self.queues.read().await.get(queue) {
            Some(tx) => tx.send(delivery).is_ok(),
            None => return Err(TransportError::UnknownQueue(queue.to_string())),
        };
        if !sent {
            // consumer went away without deleting its queue
            self.queues.write().await.remove(queue);
            return Err(TransportError::UnknownQueue(queue.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, queue: &str) -> Result<(), TransportError> {
        self.queues.write().await.remove(queue);
        Ok(())
    }
}
