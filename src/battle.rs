//! Turn-based exchange of attacks between the two players of a session.

use log::{debug, info};
use rand::rngs::SmallRng;

use crate::common::{AttackOutcome, BoardError};
use crate::config::ClientConfig;
use crate::error::ServiceError;
use crate::game::{BoardSide, GameEngine};
use crate::player::Player;
use crate::protocol::{Message, MessageType};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub enum Outcome {
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleState {
    AwaitingReady,
    FirstAttacker,
    FirstDefender,
    Battling,
    Finished(Outcome),
}

/// Whose move it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Attack,
    Defend,
}

pub const YOU_DESTROYED: &str = "You destroyed the ship!";
pub const YOU_HIT: &str = "To the point!";
pub const YOU_MISSED: &str = "You missed";
pub const ENEMY_DESTROYED: &str = "The enemy destroyed the ship";
pub const ENEMY_HIT: &str = "The enemy got hit";
pub const ENEMY_MISSED: &str = "The enemy missed!";
pub const YOU_WIN: &str = "You win!";
pub const YOU_LOSE: &str = "You lose";

/// What one attack or defence turn did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    pub target: (usize, usize),
    /// `None` when the opponent answered an attack with `End`.
    pub outcome: Option<AttackOutcome>,
    /// Line shown to the player.
    pub message: &'static str,
    pub finished: Option<Outcome>,
}

fn attack_message(outcome: AttackOutcome) -> &'static str {
    if outcome.destroy {
        YOU_DESTROYED
    } else if outcome.hit {
        YOU_HIT
    } else {
        YOU_MISSED
    }
}

fn defence_message(outcome: AttackOutcome) -> &'static str {
    if outcome.destroy {
        ENEMY_DESTROYED
    } else if outcome.hit {
        ENEMY_HIT
    } else {
        ENEMY_MISSED
    }
}

fn violation(expected: &str, got: MessageType) -> ServiceError {
    ServiceError::ProtocolViolation(format!("expected {}, got {:?}", expected, got))
}

/// One battle between `me` and `opponent` over `transport`.
///
/// Any error leaves the battle unusable; nothing is retried.
pub struct Battle<T: Transport> {
    engine: GameEngine,
    transport: T,
    me: String,
    opponent: String,
    config: ClientConfig,
    state: BattleState,
    turn: Turn,
    shots: usize,
}

impl<T: Transport> Battle<T> {
    /// Start a battle with a completely placed fleet.
    pub fn new(
        engine: GameEngine,
        transport: T,
        me: impl Into<String>,
        opponent: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, ServiceError> {
        if !engine.all_ships_placed() {
            return Err(ServiceError::ProtocolViolation(
                "battle started with an incomplete fleet".into(),
            ));
        }
        Ok(Self {
            engine,
            transport,
            me: me.into(),
            opponent: opponent.into(),
            config,
            state: BattleState::AwaitingReady,
            turn: Turn::Defend,
            shots: 0,
        })
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn into_engine(self) -> GameEngine {
        self.engine
    }

    pub fn state(&self) -> BattleState {
        self.state
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    /// Attacks sent so far.
    pub fn shots(&self) -> usize {
        self.shots
    }

    /// Decide who attacks first. Returns `true` if this side does.
    ///
    /// Both sides start a `ready_delay` timer. A side whose timer fires
    /// sends `Ready`; a side that receives `Ready` first defends. When the
    /// two `Ready`s cross (one arrives within `ready_window` after sending
    /// ours), the lexicographically smaller player name attacks first.
    pub async fn ready(&mut self) -> Result<bool, ServiceError> {
        if self.state != BattleState::AwaitingReady {
            return Err(ServiceError::ProtocolViolation(format!(
                "ready in state {:?}",
                self.state
            )));
        }
        let delay = tokio::time::sleep(self.config.ready_delay);
        tokio::pin!(delay);

        let first = tokio::select! {
            biased;
            msg = self.transport.recv() => {
                let msg = msg?;
                if msg.kind != MessageType::Ready {
                    return Err(violation("Ready", msg.kind));
                }
                false
            }
            _ = &mut delay => {
                self.transport.send(Message::ready()).await?;
                match tokio::time::timeout(self.config.ready_window, self.transport.recv()).await {
                    Err(_) => true,
                    Ok(msg) => {
                        let msg = msg?;
                        if msg.kind != MessageType::Ready {
                            return Err(violation("Ready", msg.kind));
                        }
                        debug!("ready collision between {} and {}", self.me, self.opponent);
                        self.me < self.opponent
                    }
                }
            }
        };

        self.turn = if first { Turn::Attack } else { Turn::Defend };
        self.state = if first {
            BattleState::FirstAttacker
        } else {
            BattleState::FirstDefender
        };
        info!(
            "{} vs {}: {} attacks first",
            self.me,
            self.opponent,
            if first { &self.me } else { &self.opponent }
        );
        Ok(first)
    }

    fn expect_turn(&self, turn: Turn) -> Result<(), ServiceError> {
        match self.state {
            BattleState::FirstAttacker | BattleState::FirstDefender | BattleState::Battling
                if self.turn == turn =>
            {
                Ok(())
            }
            state => Err(ServiceError::ProtocolViolation(format!(
                "{:?} turn in state {:?}",
                turn, state
            ))),
        }
    }

    /// Fire at the opponent cell `(x, y)` and apply the reply.
    pub async fn attack(&mut self, x: usize, y: usize) -> Result<TurnReport, ServiceError> {
        self.expect_turn(Turn::Attack)?;
        self.engine.opponent_board().get(x, y)?;
        if !self.engine.can_attack(x, y) {
            return Err(BoardError::AlreadyAttacked.into());
        }
        self.transport.send(Message::attack(x, y)).await?;
        self.shots += 1;
        let reply = self.transport.recv().await?;
        match reply.kind {
            MessageType::Result => {
                let outcome = reply.outcome();
                self.engine
                    .mark_outcome(x, y, outcome, BoardSide::Opponent)?;
                self.state = BattleState::Battling;
                self.turn = Turn::Defend;
                Ok(TurnReport {
                    target: (x, y),
                    outcome: Some(outcome),
                    message: attack_message(outcome),
                    finished: None,
                })
            }
            MessageType::End => {
                // the last ship went down; the loser sends End instead of Result
                self.engine
                    .mark_outcome(x, y, AttackOutcome::DESTROY, BoardSide::Opponent)?;
                self.state = BattleState::Finished(Outcome::Win);
                info!("{} beat {}", self.me, self.opponent);
                Ok(TurnReport {
                    target: (x, y),
                    outcome: None,
                    message: YOU_WIN,
                    finished: Some(Outcome::Win),
                })
            }
            other => Err(violation("Result or End", other)),
        }
    }

    /// Wait for the opponent's attack, apply it and answer.
    pub async fn defend(&mut self) -> Result<TurnReport, ServiceError> {
        self.expect_turn(Turn::Defend)?;
        let msg = self.transport.recv().await?;
        if msg.kind != MessageType::Attack {
            return Err(violation("Attack", msg.kind));
        }
        let (x, y) = (msg.x, msg.y);
        let outcome = self.engine.receive_attack(x, y)?;
        if self.engine.all_ships_destroyed() {
            self.transport.send(Message::end()).await?;
            self.state = BattleState::Finished(Outcome::Lose);
            info!("{} lost to {}", self.me, self.opponent);
            return Ok(TurnReport {
                target: (x, y),
                outcome: Some(outcome),
                message: YOU_LOSE,
                finished: Some(Outcome::Lose),
            });
        }
        self.transport.send(Message::result(outcome)).await?;
        self.state = BattleState::Battling;
        self.turn = Turn::Attack;
        Ok(TurnReport {
            target: (x, y),
            outcome: Some(outcome),
            message: defence_message(outcome),
            finished: None,
        })
    }

    /// Play the whole battle, asking `player` for every target.
    pub async fn run<P: Player + ?Sized>(
        &mut self,
        player: &mut P,
        rng: &mut SmallRng,
    ) -> Result<Outcome, ServiceError> {
        let first = self.ready().await?;
        player.handle_ready(first, &self.engine);
        loop {
            let report = match self.turn {
                Turn::Attack => {
                    let (x, y) = player.select_target(rng, &self.engine);
                    let report = self.attack(x, y).await?;
                    player.handle_attack_result(&report, &self.engine);
                    report
                }
                Turn::Defend => {
                    let report = self.defend().await?;
                    player.handle_defence(&report, &self.engine);
                    report
                }
            };
            if let Some(outcome) = report.finished {
                player.handle_finish(outcome, &self.engine);
                return Ok(outcome);
            }
        }
    }
}
