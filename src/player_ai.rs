use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::ai::Targeting;
use crate::battle::TurnReport;
use crate::common::BoardError;
use crate::config::BOARD_SIZE;
use crate::game::GameEngine;
use crate::player::Player;
use crate::ship::ShipType;

/// Computer player: random legal fleet, density-guided fire.
#[derive(Debug, Clone, Default)]
pub struct AiPlayer {
    targeting: Targeting,
}

impl AiPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Player for AiPlayer {
    fn place_fleet(&mut self, rng: &mut SmallRng, engine: &mut GameEngine) -> Result<(), BoardError> {
        *engine = GameEngine::with_random_fleet(rng)?;
        self.targeting = Targeting::new();
        Ok(())
    }

    fn select_target(&mut self, rng: &mut SmallRng, engine: &GameEngine) -> (usize, usize) {
        match self.targeting.pick(engine.opponent_board(), rng) {
            Some(target) => target,
            // nothing left to reveal; the battle rejects whatever comes back
            None => (rng.random_range(0..BOARD_SIZE), rng.random_range(0..BOARD_SIZE)),
        }
    }

    fn handle_attack_result(&mut self, report: &TurnReport, engine: &GameEngine) {
        let Some(outcome) = report.outcome else {
            return;
        };
        if outcome.destroy {
            let (x, y) = report.target;
            let sunk: Option<ShipType> = self.targeting.record_sink(engine.opponent_board(), x, y);
            debug!("ai sank {:?} at {:?}", sunk, report.target);
        }
    }
}
