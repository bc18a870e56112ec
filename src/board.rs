//! A 10×10 grid of cells and the destruction flood-fill.

use core::fmt;

use crate::bitboard::orthogonal;
use crate::common::BoardError;
use crate::config::BOARD_SIZE;
use crate::ship::{Mask, ShipType};

/// Content of one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Cell {
    Empty,
    ShipPart(ShipType),
    Hit,
    Miss,
    /// Not yet revealed. Only appears on the opponent board.
    Unknown,
}

impl Cell {
    /// Single-character rendering used by text front ends.
    pub fn glyph(self) -> char {
        match self {
            Cell::Empty => '~',
            Cell::ShipPart(_) => '▢',
            Cell::Hit => 'x',
            Cell::Miss => '•',
            Cell::Unknown => '□',
        }
    }

    /// Never attacked and not part of a ship.
    fn is_untouched(self) -> bool {
        matches!(self, Cell::Empty | Cell::Unknown)
    }
}

/// A square grid of cells indexed by `(x, y)`: `x` is the column, `y` the row.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// A player's own board: every cell `Empty`.
    pub fn own() -> Self {
        Board {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// The fog-of-war view of the opponent: every cell `Unknown`.
    pub fn fog() -> Self {
        Board {
            cells: [[Cell::Unknown; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Cell, BoardError> {
        self.cells
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .ok_or(BoardError::OutOfBounds)
    }

    pub fn set(&mut self, x: usize, y: usize, cell: Cell) -> Result<(), BoardError> {
        let slot = self
            .cells
            .get_mut(y)
            .and_then(|row| row.get_mut(x))
            .ok_or(BoardError::OutOfBounds)?;
        *slot = cell;
        Ok(())
    }

    /// Number of cells holding `cell`.
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().flatten().filter(|c| **c == cell).count()
    }

    /// Surround the sunk ship containing `(x, y)` with `Miss` markers.
    ///
    /// Walks every `Hit` cell orthogonally connected to the start cell and
    /// turns each untouched neighbour into `Miss`. The walk keeps a visited
    /// set, so no cell of the ship is expanded twice.
    pub fn mark_destroyed(&mut self, x: usize, y: usize) -> Result<(), BoardError> {
        if self.get(x, y)? != Cell::Hit {
            return Ok(());
        }
        let mut visited = Mask::new();
        let mut stack = [(0usize, 0usize); BOARD_SIZE * BOARD_SIZE];
        let mut top = 0;
        visited.set(y, x)?;
        stack[top] = (x, y);
        top += 1;

        while top > 0 {
            top -= 1;
            let (cx, cy) = stack[top];
            for (ny, nx) in orthogonal::<BOARD_SIZE>(cy, cx).into_iter().flatten() {
                let cell = self.cells[ny][nx];
                if cell == Cell::Hit {
                    if visited.insert(ny, nx)? {
                        stack[top] = (nx, ny);
                        top += 1;
                    }
                } else if cell.is_untouched() {
                    self.cells[ny][nx] = Cell::Miss;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{")?;
        fmt::Display::fmt(self, f)?;
        write!(f, "}}")
    }
}

/// Rows labelled `A`..`J`, columns `0`..`9`.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            write!(f, "{} |", (b'A' + i as u8) as char)?;
            for cell in row {
                write!(f, " {}", cell.glyph())?;
            }
            writeln!(f, " |")?;
        }
        write!(f, "  |")?;
        for c in 0..BOARD_SIZE {
            write!(f, " {}", c)?;
        }
        writeln!(f, " |")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_fill_surrounds_a_sunk_ship() {
        let mut board = Board::fog();
        for x in 3..6 {
            board.set(x, 4, Cell::Hit).unwrap();
        }
        board.mark_destroyed(4, 4).unwrap();

        for x in 3..6 {
            assert_eq!(board.get(x, 3).unwrap(), Cell::Miss);
            assert_eq!(board.get(x, 5).unwrap(), Cell::Miss);
            assert_eq!(board.get(x, 4).unwrap(), Cell::Hit);
        }
        assert_eq!(board.get(2, 4).unwrap(), Cell::Miss);
        assert_eq!(board.get(6, 4).unwrap(), Cell::Miss);
        // diagonal corners stay unrevealed
        assert_eq!(board.get(2, 3).unwrap(), Cell::Unknown);
        assert_eq!(board.count(Cell::Miss), 8);
    }

    #[test]
    fn flood_fill_at_corner_stays_on_board() {
        let mut board = Board::own();
        board.set(0, 0, Cell::Hit).unwrap();
        board.set(0, 1, Cell::Hit).unwrap();
        board.mark_destroyed(0, 1).unwrap();
        assert_eq!(board.get(1, 0).unwrap(), Cell::Miss);
        assert_eq!(board.get(1, 1).unwrap(), Cell::Miss);
        assert_eq!(board.get(0, 2).unwrap(), Cell::Miss);
        assert_eq!(board.count(Cell::Miss), 3);
    }

    #[test]
    fn out_of_bounds_access_fails() {
        let board = Board::own();
        assert_eq!(board.get(10, 0), Err(BoardError::OutOfBounds));
    }
}
