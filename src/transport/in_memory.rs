use tokio::sync::mpsc;

use crate::broker::TransportError;
use crate::protocol::Message;
use crate::transport::Transport;

/// Two connected in-process endpoints.
pub struct InMemoryTransport {
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl InMemoryTransport {
    pub fn pair() -> (Self, Self) {
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        (Self { tx: tx1, rx: rx2 }, Self { tx: tx2, rx: rx1 })
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        self.tx.send(msg).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Message, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }
}
