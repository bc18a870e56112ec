//! Common types for the board engine: errors and attack outcomes.

use crate::bitboard::BitBoardError;

/// Result of resolving an attack against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackOutcome {
    /// The attacked cell held part of a ship.
    pub hit: bool,
    /// The hit sank the ship: every one of its cells is now `Hit`.
    pub destroy: bool,
}

impl AttackOutcome {
    pub const MISS: AttackOutcome = AttackOutcome {
        hit: false,
        destroy: false,
    };
    pub const HIT: AttackOutcome = AttackOutcome {
        hit: true,
        destroy: false,
    };
    pub const DESTROY: AttackOutcome = AttackOutcome {
        hit: true,
        destroy: true,
    };
}

/// Errors returned by board operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// Every ship of this type has already been placed.
    AlreadyPlaced,
    /// The ship would run off the board, or touch or cross another ship.
    Overlap,
    /// The cell has already been attacked.
    AlreadyAttacked,
    /// Coordinates outside the board.
    OutOfBounds,
}

impl From<BitBoardError> for BoardError {
    fn from(_: BitBoardError) -> Self {
        BoardError::OutOfBounds
    }
}

impl core::fmt::Display for BoardError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BoardError::AlreadyPlaced => write!(f, "All ships of this type are already placed"),
            BoardError::Overlap => write!(f, "Fields are already occupied"),
            BoardError::AlreadyAttacked => write!(f, "Already attacked"),
            BoardError::OutOfBounds => write!(f, "Coordinates are out of the board"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BoardError {}
