use rand::Rng;

use crate::board::{Board, Cell};
use crate::common::{AttackOutcome, BoardError};
use crate::config::{BOARD_SIZE, FLEET, NUM_SHIPS};
use crate::ship::{Direction, Mask, Ship, ShipType};

/// Which of the two boards an outcome is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSide {
    Own,
    Opponent,
}

/// Status of a game from this player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

/// Core game logic holding a player's fleet and both boards.
///
/// The own board is fully known; the opponent board starts as fog of war and
/// only changes through [`GameEngine::mark_outcome`].
#[derive(Clone)]
pub struct GameEngine {
    own: Board,
    opponent: Board,
    ships: [Option<Ship>; NUM_SHIPS],
    ship_ids: [[Option<u8>; BOARD_SIZE]; BOARD_SIZE],
    occupied: Mask,
    placed: [usize; ShipType::COUNT],
    afloat: [usize; ShipType::COUNT],
    enemy_sunk: usize,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    /// An engine with an empty own board and an unrevealed opponent board.
    pub fn new() -> Self {
        Self {
            own: Board::own(),
            opponent: Board::fog(),
            ships: [None; NUM_SHIPS],
            ship_ids: [[None; BOARD_SIZE]; BOARD_SIZE],
            occupied: Mask::new(),
            placed: [0; ShipType::COUNT],
            afloat: [0; ShipType::COUNT],
            enemy_sunk: 0,
        }
    }

    pub fn own_board(&self) -> &Board {
        &self.own
    }

    pub fn opponent_board(&self) -> &Board {
        &self.opponent
    }

    pub fn board(&self, side: BoardSide) -> &Board {
        match side {
            BoardSide::Own => &self.own,
            BoardSide::Opponent => &self.opponent,
        }
    }

    /// Ships placed so far, in placement order.
    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.iter().flatten()
    }

    /// Place a ship with its origin at `(x, y)`.
    ///
    /// Fails with `AlreadyPlaced` once the fleet holds every ship of this type,
    /// and with `Overlap` when the ship would leave the board or any of its
    /// cells, or a cell orthogonally next to one, is already occupied.
    pub fn place_ship(
        &mut self,
        x: usize,
        y: usize,
        ship_type: ShipType,
        direction: Direction,
    ) -> Result<(), BoardError> {
        if self.placed[ship_type.index()] >= ship_type.fleet_max() {
            return Err(BoardError::AlreadyPlaced);
        }
        let ship = Ship::new(ship_type, x, y, direction)?;
        if !(ship.mask().with_neighbors() & self.occupied).is_empty() {
            return Err(BoardError::Overlap);
        }
        let id = self.ships.iter().position(Option::is_none).ok_or(BoardError::AlreadyPlaced)?;
        for (cx, cy) in ship.cells() {
            self.own.set(cx, cy, Cell::ShipPart(ship_type))?;
            self.ship_ids[cy][cx] = Some(id as u8);
        }
        self.occupied |= ship.mask();
        self.ships[id] = Some(ship);
        self.placed[ship_type.index()] += 1;
        self.afloat[ship_type.index()] += 1;
        Ok(())
    }

    /// Ships of `ship_type` still to be placed.
    pub fn available(&self, ship_type: ShipType) -> usize {
        ship_type.fleet_max() - self.placed[ship_type.index()]
    }

    /// Ships of `ship_type` still afloat on the own board.
    pub fn afloat(&self, ship_type: ShipType) -> usize {
        self.afloat[ship_type.index()]
    }

    /// Returns a random legal `(x, y, direction)` for `ship_type`.
    pub fn random_placement<R: Rng>(
        &self,
        rng: &mut R,
        ship_type: ShipType,
    ) -> Result<(usize, usize, Direction), BoardError> {
        if self.available(ship_type) == 0 {
            return Err(BoardError::AlreadyPlaced);
        }
        for _ in 0..1000 {
            let x = rng.random_range(0..BOARD_SIZE);
            let y = rng.random_range(0..BOARD_SIZE);
            let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
            let Ok(ship) = Ship::new(ship_type, x, y, direction) else {
                continue;
            };
            if (ship.mask().with_neighbors() & self.occupied).is_empty() {
                return Ok((x, y, direction));
            }
        }
        Err(BoardError::Overlap)
    }

    /// A fresh engine holding a complete, randomly placed fleet.
    pub fn with_random_fleet<R: Rng>(rng: &mut R) -> Result<Self, BoardError> {
        let mut engine = GameEngine::new();
        engine.fill_randomly(rng)?;
        Ok(engine)
    }

    /// Place every ship still available at random, keeping the ships already
    /// placed. Largest ships go first; a layout that paints itself into a
    /// corner is thrown away and retried.
    pub fn fill_randomly<R: Rng>(&mut self, rng: &mut R) -> Result<(), BoardError> {
        'layout: for _ in 0..100 {
            let mut trial = self.clone();
            for ship_type in ShipType::ALL.iter().rev().copied() {
                while trial.available(ship_type) > 0 {
                    let Ok((x, y, dir)) = trial.random_placement(rng, ship_type) else {
                        continue 'layout;
                    };
                    trial.place_ship(x, y, ship_type, dir)?;
                }
            }
            *self = trial;
            return Ok(());
        }
        Err(BoardError::Overlap)
    }

    /// `true` iff the opponent cell at `(x, y)` has not been revealed yet.
    pub fn can_attack(&self, x: usize, y: usize) -> bool {
        self.opponent.get(x, y) == Ok(Cell::Unknown)
    }

    /// Work out what an incoming attack on the own board does, without
    /// changing anything. `destroy` is computed from the hit ship's own
    /// remaining-cell count.
    pub fn resolve_attack(&self, x: usize, y: usize) -> Result<AttackOutcome, BoardError> {
        match self.own.get(x, y)? {
            Cell::ShipPart(_) => {
                let ship = self.ship_at(x, y).ok_or(BoardError::OutOfBounds)?;
                Ok(AttackOutcome {
                    hit: true,
                    destroy: ship.remaining() == 1,
                })
            }
            Cell::Empty => Ok(AttackOutcome::MISS),
            Cell::Hit | Cell::Miss | Cell::Unknown => Err(BoardError::AlreadyAttacked),
        }
    }

    /// Write an attack outcome onto one board. A hit becomes `Hit`, a miss
    /// becomes `Miss`; a destroying hit also surrounds the ship with misses.
    pub fn mark_outcome(
        &mut self,
        x: usize,
        y: usize,
        outcome: AttackOutcome,
        side: BoardSide,
    ) -> Result<(), BoardError> {
        let cell = if outcome.hit { Cell::Hit } else { Cell::Miss };
        match side {
            BoardSide::Own => {
                // only an intact ship cell can cost the ship a deck
                let intact = matches!(self.own.get(x, y)?, Cell::ShipPart(_));
                if outcome.hit && intact {
                    if let Some(id) = self.ship_ids[y][x] {
                        if let Some(ship) = self.ships[id as usize].as_mut() {
                            if ship.take_hit() {
                                let left = &mut self.afloat[ship.ship_type().index()];
                                *left = left.saturating_sub(1);
                            }
                        }
                    }
                }
                self.own.set(x, y, cell)?;
            }
            BoardSide::Opponent => {
                self.opponent.set(x, y, cell)?;
                if outcome.destroy {
                    self.enemy_sunk += 1;
                }
            }
        }
        if outcome.destroy {
            self.board_mut(side).mark_destroyed(x, y)?;
        }
        Ok(())
    }

    /// Resolve an incoming attack and record it on the own board.
    pub fn receive_attack(&mut self, x: usize, y: usize) -> Result<AttackOutcome, BoardError> {
        let outcome = self.resolve_attack(x, y)?;
        self.mark_outcome(x, y, outcome, BoardSide::Own)?;
        Ok(outcome)
    }

    pub fn all_ships_placed(&self) -> bool {
        self.placed == FLEET
    }

    pub fn all_ships_destroyed(&self) -> bool {
        self.afloat.iter().all(|n| *n == 0)
    }

    /// Number of opponent ships this player has sunk.
    pub fn enemy_ships_sunk(&self) -> usize {
        self.enemy_sunk
    }

    /// Evaluate the current game status.
    pub fn status(&self) -> GameStatus {
        if self.all_ships_placed() && self.all_ships_destroyed() {
            GameStatus::Lost
        } else if self.enemy_sunk == NUM_SHIPS {
            GameStatus::Won
        } else {
            GameStatus::InProgress
        }
    }

    fn ship_at(&self, x: usize, y: usize) -> Option<&Ship> {
        let id = self.ship_ids.get(y)?.get(x)?.as_ref()?;
        self.ships[*id as usize].as_ref()
    }

    fn board_mut(&mut self, side: BoardSide) -> &mut Board {
        match side {
            BoardSide::Own => &mut self.own,
            BoardSide::Opponent => &mut self.opponent,
        }
    }
}
