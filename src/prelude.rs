//! Commonly used types for ease of import.

pub use crate::broker::{Broker, InMemoryBroker, TcpBroker};
pub use crate::transport::{InMemoryTransport, QueueTransport, Transport};
pub use crate::{
    AiPlayer, AttackOutcome, Battle, BoardError, CliPlayer, ClientConfig, Direction, GameClient,
    GameEngine, GameServer, GameStatus, Matchmaking, Outcome, Player, PlayerNode, ServiceError,
    ShipType, Statistics,
};
