use rand::rngs::SmallRng;

use crate::battle::{Outcome, TurnReport};
use crate::common::BoardError;
use crate::game::GameEngine;

/// Decision maker behind one side of a battle.
pub trait Player: Send {
    /// Place the whole fleet onto `engine`.
    fn place_fleet(&mut self, rng: &mut SmallRng, engine: &mut GameEngine) -> Result<(), BoardError>;

    /// Choose the next opponent cell to attack. Must be a cell for which
    /// `engine.can_attack` holds.
    fn select_target(&mut self, rng: &mut SmallRng, engine: &GameEngine) -> (usize, usize);

    /// The turn order has been settled.
    fn handle_ready(&mut self, _first: bool, _engine: &GameEngine) {}

    /// Result of this player's last attack.
    fn handle_attack_result(&mut self, _report: &TurnReport, _engine: &GameEngine) {}

    /// An opponent attack has been applied to the own board.
    fn handle_defence(&mut self, _report: &TurnReport, _engine: &GameEngine) {}

    fn handle_finish(&mut self, _outcome: Outcome, _engine: &GameEngine) {}
}
