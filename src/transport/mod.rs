use crate::broker::TransportError;
use crate::protocol::Message;

/// Point-to-point channel carrying battle messages to the opponent.
///
/// `recv` must be cancel-safe: a battle races it against timers.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError>;
    async fn recv(&mut self) -> Result<Message, TransportError>;
}

pub mod in_memory;
pub mod queue;

pub use in_memory::InMemoryTransport;
pub use queue::QueueTransport;
