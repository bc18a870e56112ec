//! A fixed-size cell mask using const generics.
//!
//! Masks are `N×N` grids packed into an unsigned integer `T`, addressed by
//! `(row, col)`. The board engine uses them for ship footprints, the
//! placement exclusion zone and the flood-fill visited set.

use core::ops::{BitAnd, BitOr, BitOrAssign};
use core::{fmt, mem};
use num_traits::{PrimInt, Unsigned, Zero};

/// Errors returned by bitboard operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitBoardError {
    /// Row or column index is out of bounds [0..N).
    IndexOutOfBounds { row: usize, col: usize },
}

impl fmt::Display for BitBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitBoardError::IndexOutOfBounds { row, col } => {
                write!(f, "IndexOutOfBounds: row={}, col={}", row, col)
            }
        }
    }
}

/// A fixed-size N×N bitboard stored in the unsigned integer `T`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitBoard<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    bits: T,
}

impl<T, const N: usize> BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    const BOARD_BITS: usize = N * N;

    #[inline]
    fn mask() -> T {
        if Self::BOARD_BITS == mem::size_of::<T>() * 8 {
            !T::zero()
        } else {
            (T::one() << Self::BOARD_BITS) - T::one()
        }
    }

    /// Create a new empty bitboard.
    #[inline]
    pub fn new() -> Self {
        BitBoard { bits: T::zero() }
    }

    /// Returns the number of set cells.
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Returns true if no cells are set.
    pub fn is_empty(&self) -> bool {
        self.bits.is_zero()
    }

    /// Gets the cell at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Result<bool, BitBoardError> {
        self.check_bounds(row, col)?;
        Ok(((self.bits >> (row * N + col)) & T::one()) != T::zero())
    }

    /// Sets the cell at (row, col).
    pub fn set(&mut self, row: usize, col: usize) -> Result<(), BitBoardError> {
        self.check_bounds(row, col)?;
        self.bits = self.bits | (T::one() << (row * N + col));
        Ok(())
    }

    /// Returns `true` if the cell was newly set, `false` if it already was.
    pub fn insert(&mut self, row: usize, col: usize) -> Result<bool, BitBoardError> {
        let was_set = self.get(row, col)?;
        self.set(row, col)?;
        Ok(!was_set)
    }

    /// This mask grown by one cell in each orthogonal direction, clipped to
    /// the board. Diagonal cells are not added.
    pub fn with_neighbors(&self) -> Self {
        let mut grown = *self;
        for (r, c) in self.iter() {
            for (nr, nc) in orthogonal::<N>(r, c).into_iter().flatten() {
                grown.bits = grown.bits | (T::one() << (nr * N + nc));
            }
        }
        grown
    }

    #[inline]
    fn check_bounds(&self, row: usize, col: usize) -> Result<(), BitBoardError> {
        if row >= N || col >= N {
            Err(BitBoardError::IndexOutOfBounds { row, col })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn from_raw(raw: T) -> Self {
        BitBoard {
            bits: raw & Self::mask(),
        }
    }

    /// Iterator over the set cells in row-major order.
    pub fn iter(&self) -> SetBits<T, N> {
        SetBits {
            bits: self.bits,
            idx: 0,
        }
    }
}

/// The up to four in-bounds orthogonal neighbours of `(row, col)`.
pub fn orthogonal<const N: usize>(row: usize, col: usize) -> [Option<(usize, usize)>; 4] {
    [
        row.checked_sub(1).map(|r| (r, col)),
        (row + 1 < N).then_some((row + 1, col)),
        col.checked_sub(1).map(|c| (row, c)),
        (col + 1 < N).then_some((row, col + 1)),
    ]
}

impl<T, const N: usize> Default for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitBoard<{}>:", N)?;
        for r in 0..N {
            for c in 0..N {
                let set = ((self.bits >> (r * N + c)) & T::one()) != T::zero();
                write!(f, "{} ", if set { '■' } else { '□' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Iterator over the set cells of a bitboard.
#[derive(Clone, Copy)]
pub struct SetBits<T, const N: usize> {
    bits: T,
    idx: usize,
}

impl<T, const N: usize> Iterator for SetBits<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < N * N {
            let idx = self.idx;
            self.idx += 1;
            if ((self.bits >> idx) & T::one()) != T::zero() {
                return Some((idx / N, idx % N));
            }
        }
        None
    }
}

impl<T, const N: usize> BitAnd for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self::from_raw(self.bits & rhs.bits)
    }
}

impl<T, const N: usize> BitOr for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self::from_raw(self.bits | rhs.bits)
    }
}

impl<T, const N: usize> BitOrAssign for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits = self.bits | rhs.bits;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    type BB = BitBoard<u128, 10>;

    #[test]
    fn neighbors_are_orthogonal_and_clipped() {
        let mut bb = BB::new();
        bb.set(0, 0).unwrap();
        let grown = bb.with_neighbors();
        let cells: std::vec::Vec<_> = grown.iter().collect();
        assert_eq!(cells, std::vec![(0, 0), (0, 1), (1, 0)]);
        assert!(!grown.get(1, 1).unwrap());
    }

    #[test]
    fn insert_reports_first_visit() {
        let mut bb = BB::new();
        assert!(bb.insert(3, 4).unwrap());
        assert!(!bb.insert(3, 4).unwrap());
        assert_eq!(bb.count_ones(), 1);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut bb = BB::new();
        assert_eq!(
            bb.set(10, 0),
            Err(BitBoardError::IndexOutOfBounds { row: 10, col: 0 })
        );
    }
}
