//! Ship types, directions and placed ships.

use core::fmt;

use crate::bitboard::BitBoard;
use crate::common::BoardError;
use crate::config::{BOARD_SIZE, FLEET};

pub(crate) type Mask = BitBoard<u128, BOARD_SIZE>;

/// Type of ship, by deck count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum ShipType {
    SingleDeck,
    TwoDeck,
    ThreeDeck,
    FourDeck,
}

impl ShipType {
    pub const COUNT: usize = 4;

    /// All ship types, shortest first.
    pub const ALL: [ShipType; Self::COUNT] = [
        ShipType::SingleDeck,
        ShipType::TwoDeck,
        ShipType::ThreeDeck,
        ShipType::FourDeck,
    ];

    /// Number of cells a ship of this type occupies.
    pub const fn length(self) -> usize {
        self.index() + 1
    }

    /// Position of this type in per-type counters.
    pub const fn index(self) -> usize {
        match self {
            ShipType::SingleDeck => 0,
            ShipType::TwoDeck => 1,
            ShipType::ThreeDeck => 2,
            ShipType::FourDeck => 3,
        }
    }

    /// Maximum number of ships of this type in a fleet.
    pub const fn fleet_max(self) -> usize {
        FLEET[self.index()]
    }

    pub fn from_length(length: usize) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.length() == length)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShipType::SingleDeck => "single-deck",
            ShipType::TwoDeck => "two-deck",
            ShipType::ThreeDeck => "three-deck",
            ShipType::FourDeck => "four-deck",
        }
    }
}

impl fmt::Display for ShipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction a ship extends in from its origin cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step as `(dx, dy)`; `y` grows downwards.
    pub const fn step(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// A ship on its owner's board with its own hit bookkeeping.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ship {
    ship_type: ShipType,
    origin: (usize, usize),
    direction: Direction,
    mask: Mask,
    remaining: usize,
}

impl Ship {
    /// Lay out a ship from `(x, y)` in `direction`. Every cell must be on
    /// the board; a ship running off an edge is reported as `Overlap`.
    pub fn new(
        ship_type: ShipType,
        x: usize,
        y: usize,
        direction: Direction,
    ) -> Result<Self, BoardError> {
        let (dx, dy) = direction.step();
        let mut mask = Mask::new();
        for i in 0..ship_type.length() as isize {
            let cx = x as isize + dx * i;
            let cy = y as isize + dy * i;
            if cx < 0 || cy < 0 || cx >= BOARD_SIZE as isize || cy >= BOARD_SIZE as isize {
                return Err(BoardError::Overlap);
            }
            mask.set(cy as usize, cx as usize)?;
        }
        Ok(Ship {
            ship_type,
            origin: (x, y),
            direction,
            mask,
            remaining: ship_type.length(),
        })
    }

    pub fn ship_type(&self) -> ShipType {
        self.ship_type
    }

    /// Origin cell as `(x, y)`.
    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Cells of the ship as a row/column mask.
    pub(crate) fn mask(&self) -> Mask {
        self.mask
    }

    /// Cells as `(x, y)` pairs.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        self.mask.iter().map(|(r, c)| (c, r))
    }

    pub fn occupies(&self, x: usize, y: usize) -> bool {
        self.mask.get(y, x).unwrap_or(false)
    }

    /// Register one hit; returns `true` when this hit sinks the ship.
    pub(crate) fn take_hit(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    /// Number of cells not yet hit.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_sunk(&self) -> bool {
        self.remaining == 0
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ type: {}, origin: {:?}, direction: {:?}, remaining: {} }}",
            self.ship_type, self.origin, self.direction, self.remaining,
        )
    }
}
