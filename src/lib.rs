#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

mod bitboard;
mod board;
mod common;
mod config;
mod game;
pub mod protocol;
mod ship;

#[cfg(feature = "std")]
mod ai;
#[cfg(feature = "std")]
pub mod api;
#[cfg(feature = "std")]
pub mod auth;
#[cfg(feature = "std")]
pub mod battle;
#[cfg(feature = "std")]
pub mod broker;
#[cfg(feature = "std")]
pub mod client;
#[cfg(feature = "std")]
pub mod error;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
mod player;
#[cfg(feature = "std")]
mod player_ai;
#[cfg(feature = "std")]
mod player_cli;
#[cfg(feature = "std")]
pub mod player_node;
#[cfg(feature = "std")]
pub mod prelude;
#[cfg(feature = "std")]
pub mod registry;
#[cfg(feature = "std")]
pub mod rpc;
#[cfg(feature = "std")]
pub mod server;
#[cfg(feature = "std")]
pub mod stats;
#[cfg(feature = "std")]
pub mod transport;

pub use bitboard::{BitBoard, BitBoardError};
pub use board::*;
pub use common::*;
pub use config::*;
pub use game::*;
pub use protocol::{Message, MessageType, UnknownMessageType};
pub use ship::*;

#[cfg(feature = "std")]
pub use ai::{Density, Targeting};
#[cfg(feature = "std")]
pub use battle::{Battle, BattleState, Outcome, Turn, TurnReport};
#[cfg(feature = "std")]
pub use client::GameClient;
#[cfg(feature = "std")]
pub use error::ServiceError;
#[cfg(feature = "std")]
pub use logging::init_logging;
#[cfg(feature = "std")]
pub use player::Player;
#[cfg(feature = "std")]
pub use player_ai::AiPlayer;
#[cfg(feature = "std")]
pub use player_cli::{coord_to_string, parse_coord, parse_direction, CliPlayer};
#[cfg(feature = "std")]
pub use player_node::{Account, GameSummary, Matchmaking, PlayerNode};
#[cfg(feature = "std")]
pub use server::{GameServer, ServerHandle};
#[cfg(feature = "std")]
pub use stats::Statistics;
