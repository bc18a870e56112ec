use std::io::{self, BufRead, BufReader, Write};

use rand::rngs::SmallRng;

use crate::ai::Targeting;
use crate::battle::{Outcome, TurnReport};
use crate::common::BoardError;
use crate::config::BOARD_SIZE;
use crate::game::GameEngine;
use crate::player::Player;
use crate::ship::{Direction, ShipType};

/// Human player on a terminal. Targets are typed as a row letter and a
/// column digit, e.g. `C7`.
pub struct CliPlayer {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
    hints: Targeting,
}

impl CliPlayer {
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            input,
            output,
            hints: Targeting::new(),
        }
    }

    pub fn stdio() -> Self {
        Self::new(Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    /// `None` on end of input.
    fn prompt(&mut self, text: &str) -> Option<String> {
        let _ = write!(self.output, "{}", text);
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn say(&mut self, line: &str) {
        let _ = writeln!(self.output, "{}", line);
    }

    fn show(&mut self, engine: &GameEngine) {
        let _ = writeln!(
            self.output,
            "Opponent board:\n{}\nYour board:\n{}",
            engine.opponent_board(),
            engine.own_board()
        );
    }
}

/// Render `(x, y)` as typed by the player.
pub fn coord_to_string(x: usize, y: usize) -> String {
    format!("{}{}", (b'A' + y as u8) as char, x)
}

/// Parse `A0`..`J9` into `(x, y)`.
pub fn parse_coord(input: &str) -> Option<(usize, usize)> {
    let mut chars = input.trim().chars();
    let row = chars.next()?.to_ascii_uppercase();
    if !row.is_ascii_uppercase() {
        return None;
    }
    let y = (row as u8 - b'A') as usize;
    let x: usize = chars.as_str().parse().ok()?;
    (x < BOARD_SIZE && y < BOARD_SIZE).then_some((x, y))
}

pub fn parse_direction(input: &str) -> Option<Direction> {
    match input.trim().to_ascii_lowercase().as_str() {
        "u" | "up" => Some(Direction::Up),
        "d" | "down" => Some(Direction::Down),
        "l" | "left" => Some(Direction::Left),
        "r" | "right" => Some(Direction::Right),
        _ => None,
    }
}

impl Player for CliPlayer {
    fn place_fleet(&mut self, rng: &mut SmallRng, engine: &mut GameEngine) -> Result<(), BoardError> {
        self.say("Place your ships, e.g. `B3 right`. Press enter to place the rest at random.");
        for ship_type in ShipType::ALL.iter().rev().copied() {
            while engine.available(ship_type) > 0 {
                let _ = writeln!(self.output, "{}", engine.own_board());
                let text = format!("Place {} (length {}): ", ship_type, ship_type.length());
                let line = self.prompt(&text).unwrap_or_default();
                if line.is_empty() {
                    return engine.fill_randomly(rng);
                }
                let mut parts = line.split_whitespace();
                let coord = parts.next().and_then(parse_coord);
                let dir = match ship_type {
                    ShipType::SingleDeck => Some(Direction::Right),
                    _ => parts.next().and_then(parse_direction),
                };
                match (coord, dir) {
                    (Some((x, y)), Some(dir)) => {
                        if let Err(e) = engine.place_ship(x, y, ship_type, dir) {
                            self.say(&format!("Error: {}", e));
                        }
                    }
                    _ => self.say("Invalid input"),
                }
            }
        }
        Ok(())
    }

    fn select_target(&mut self, rng: &mut SmallRng, engine: &GameEngine) -> (usize, usize) {
        self.show(engine);
        let suggestion = self.hints.pick(engine.opponent_board(), rng).unwrap_or((0, 0));
        loop {
            let text = format!(
                "Enter target [{}]: ",
                coord_to_string(suggestion.0, suggestion.1)
            );
            let Some(line) = self.prompt(&text) else {
                return suggestion;
            };
            if line.is_empty() {
                return suggestion;
            }
            match parse_coord(&line) {
                Some((x, y)) if engine.can_attack(x, y) => return (x, y),
                Some(_) => self.say("You already fired there"),
                None => self.say("Invalid coordinate"),
            }
        }
    }

    fn handle_ready(&mut self, first: bool, _engine: &GameEngine) {
        self.say(if first {
            "You attack first"
        } else {
            "Opponent attacks first"
        });
    }

    fn handle_attack_result(&mut self, report: &TurnReport, engine: &GameEngine) {
        if let Some(outcome) = report.outcome {
            if outcome.destroy {
                self.hints
                    .record_sink(engine.opponent_board(), report.target.0, report.target.1);
            }
        }
        self.say(report.message);
    }

    fn handle_defence(&mut self, report: &TurnReport, _engine: &GameEngine) {
        let (x, y) = report.target;
        self.say(&format!("{} at {}", report.message, coord_to_string(x, y)));
    }

    fn handle_finish(&mut self, outcome: Outcome, engine: &GameEngine) {
        self.show(engine);
        self.say(match outcome {
            Outcome::Win => crate::battle::YOU_WIN,
            Outcome::Lose => crate::battle::YOU_LOSE,
        });
    }
}
