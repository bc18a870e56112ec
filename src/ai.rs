// Density-based targeting against the opponent's fog-of-war board.

use rand::Rng;

use crate::bitboard::orthogonal;
use crate::board::{Board, Cell};
use crate::config::{BOARD_SIZE, FLEET};
use crate::ship::{Mask, ShipType};

const GRID: usize = BOARD_SIZE;

/// Placements covering `n` unresolved hits weigh `HIT_BIAS^n`.
const HIT_BIAS: f64 = 10.0;

/// Below 1.0 sampling concentrates on the densest cells.
const TEMPERATURE: f64 = 0.5;

pub type Density = [[f64; GRID]; GRID];

/// What the attacker knows about the opponent fleet beyond the board itself.
#[derive(Debug, Clone)]
pub struct Targeting {
    remaining: [usize; ShipType::COUNT],
    sunk: Mask,
}

impl Default for Targeting {
    fn default() -> Self {
        Self::new()
    }
}

impl Targeting {
    pub fn new() -> Self {
        Self {
            remaining: FLEET,
            sunk: Mask::new(),
        }
    }

    /// Opponent ships of each type not yet sunk.
    pub fn remaining(&self) -> &[usize; ShipType::COUNT] {
        &self.remaining
    }

    /// Record that the hit at `(x, y)` sank a ship. The ship is the run of
    /// connected `Hit` cells through `(x, y)` that were not part of an
    /// earlier sinking; its length tells the type.
    pub fn record_sink(&mut self, board: &Board, x: usize, y: usize) -> Option<ShipType> {
        let mut ship = Mask::new();
        let mut stack = [(0usize, 0usize); GRID * GRID];
        let mut top = 0;
        if board.get(x, y) != Ok(Cell::Hit) {
            return None;
        }
        ship.insert(y, x).ok()?;
        stack[top] = (x, y);
        top += 1;
        while top > 0 {
            top -= 1;
            let (cx, cy) = stack[top];
            for (ny, nx) in orthogonal::<GRID>(cy, cx).into_iter().flatten() {
                if board.get(nx, ny) == Ok(Cell::Hit)
                    && !self.sunk.get(ny, nx).unwrap_or(true)
                    && ship.insert(ny, nx).unwrap_or(false)
                {
                    stack[top] = (nx, ny);
                    top += 1;
                }
            }
        }
        self.sunk |= ship;
        let ship_type = ShipType::from_length(ship.count_ones())?;
        let left = &mut self.remaining[ship_type.index()];
        *left = left.saturating_sub(1);
        Some(ship_type)
    }

    /// Relative likelihood of a ship segment on every still unknown cell.
    pub fn density(&self, board: &Board) -> Density {
        let mut matrix = [[0.0f64; GRID]; GRID];
        for ship_type in ShipType::ALL {
            let count = self.remaining[ship_type.index()];
            if count == 0 {
                continue;
            }
            let len = ship_type.length();
            for vertical in [false, true] {
                let (max_x, max_y) = if vertical {
                    (GRID, GRID - len + 1)
                } else {
                    (GRID - len + 1, GRID)
                };
                for y in 0..max_y {
                    for x in 0..max_x {
                        let cells = (0..len).map(|k| if vertical { (x, y + k) } else { (x + k, y) });
                        let mut hits = 0;
                        let mut valid = true;
                        for (cx, cy) in cells.clone() {
                            match board.get(cx, cy) {
                                Ok(Cell::Unknown) => {}
                                Ok(Cell::Hit) if !self.sunk.get(cy, cx).unwrap_or(true) => hits += 1,
                                _ => {
                                    valid = false;
                                    break;
                                }
                            }
                        }
                        if !valid {
                            continue;
                        }
                        let weight = count as f64 * HIT_BIAS.powi(hits);
                        for (cx, cy) in cells {
                            if board.get(cx, cy) == Ok(Cell::Unknown) {
                                matrix[cy][cx] += weight;
                            }
                        }
                    }
                }
            }
        }
        matrix
    }

    /// Choose the next unknown cell to fire at. Returns `None` when no cell
    /// is unknown.
    pub fn pick<R: Rng + ?Sized>(&self, board: &Board, rng: &mut R) -> Option<(usize, usize)> {
        let density = self.density(board);
        sample(&density, rng).or_else(|| random_unknown(board, rng))
    }
}

/// Sample a cell with probability proportional to `density^(1/T)`.
fn sample<R: Rng + ?Sized>(density: &Density, rng: &mut R) -> Option<(usize, usize)> {
    let mut adjusted = [[0.0f64; GRID]; GRID];
    let mut total = 0.0;
    for y in 0..GRID {
        for x in 0..GRID {
            let v = density[y][x].powf(1.0 / TEMPERATURE);
            adjusted[y][x] = v;
            total += v;
        }
    }
    if total <= 0.0 {
        return None;
    }
    let threshold: f64 = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last = None;
    for y in 0..GRID {
        for x in 0..GRID {
            if adjusted[y][x] <= 0.0 {
                continue;
            }
            cumulative += adjusted[y][x];
            last = Some((x, y));
            if threshold < cumulative {
                return last;
            }
        }
    }
    last
}

fn random_unknown<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<(usize, usize)> {
    let unknown = board.count(Cell::Unknown);
    if unknown == 0 {
        return None;
    }
    let nth = rng.random_range(0..unknown);
    (0..GRID)
        .flat_map(|y| (0..GRID).map(move |x| (x, y)))
        .filter(|&(x, y)| board.get(x, y) == Ok(Cell::Unknown))
        .nth(nth)
}
