//! Grid model: a rows x cols board that always holds exactly one tile per cell.

use crate::tile::{Blocker, CandyColor, Tile, TileFactory};
use std::ops::{Index, IndexMut};
use thiserror::Error;
use tracing::warn;

/// Colour draws per cell before the initial fill stops sampling and picks deterministically.
const MAX_COLOR_DRAWS: u32 = 64;

/// Longest side a board may have.
pub const MAX_SIDE: usize = 64;

/// (row, column); row 0 is the top of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True when `other` is directly above, below, left or right of `self`.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Neighbour in the given direction; `None` if it would leave the top/left edge.
    pub fn offset(self, d_row: isize, d_col: isize) -> Option<Self> {
        Some(Self {
            row: self.row.checked_add_signed(d_row)?,
            col: self.col.checked_add_signed(d_col)?,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    #[error("{requested} blockers requested but the grid only has {cells} cells")]
    TooManyBlockers { requested: usize, cells: usize },
    #[error("{rows}x{cols} board exceeds the {max}x{max} limit", max = MAX_SIDE)]
    TooLarge { rows: usize, cols: usize },
    #[error("unknown candy letter {0:?}")]
    UnknownColor(char),
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Rejects dimensions and blocker counts that could never produce a playable board.
pub fn check_layout(rows: usize, cols: usize, ice: usize, locks: usize) -> Result<(), GridError> {
    if rows == 0 || cols == 0 {
        return Err(GridError::EmptyGrid);
    }
    let cells = match rows.checked_mul(cols) {
        Some(cells) if rows <= MAX_SIDE && cols <= MAX_SIDE => cells,
        _ => return Err(GridError::TooLarge { rows, cols }),
    };
    let requested = ice.saturating_add(locks);
    if requested >= cells {
        return Err(GridError::TooManyBlockers { requested, cells });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// cells[row][col]; cells[0] is the top row.
    cells: Vec<Vec<Tile>>,
}

impl Grid {
    /// Random board with no pre-formed runs of three, then `ice` and `locks` blockers
    /// on distinct cells.
    pub fn initialize(
        rows: usize,
        cols: usize,
        ice: usize,
        locks: usize,
        factory: &mut TileFactory,
    ) -> Result<Self, GridError> {
        check_layout(rows, cols, ice, locks)?;
        let mut cells: Vec<Vec<Tile>> = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut line: Vec<Tile> = Vec::with_capacity(cols);
            for col in 0..cols {
                let color = pick_fill_color(&cells, &line, row, col, factory);
                line.push(factory.create(Coord::new(row, col), Some(color)));
            }
            cells.push(line);
        }
        let mut grid = Self { rows, cols, cells };
        grid.place_blockers(Blocker::Ice, ice, factory);
        grid.place_blockers(Blocker::Lock, locks, factory);
        Ok(grid)
    }

    /// Board from one string per row, one palette letter per cell (see `CandyColor::letter`).
    pub fn from_rows(rows: &[&str], factory: &mut TileFactory) -> Result<Self, GridError> {
        let expected = rows.first().map_or(0, |r| r.chars().count());
        if expected == 0 {
            return Err(GridError::EmptyGrid);
        }
        if rows.len() > MAX_SIDE || expected > MAX_SIDE {
            return Err(GridError::TooLarge {
                rows: rows.len(),
                cols: expected,
            });
        }
        let mut cells = Vec::with_capacity(rows.len());
        for (row, text) in rows.iter().enumerate() {
            let found = text.chars().count();
            if found != expected {
                return Err(GridError::RaggedRows {
                    row,
                    expected,
                    found,
                });
            }
            let line = text
                .chars()
                .enumerate()
                .map(|(col, c)| -> Result<Tile, GridError> {
                    let color = CandyColor::from_letter(c).ok_or(GridError::UnknownColor(c))?;
                    Ok(factory.create(Coord::new(row, col), Some(color)))
                })
                .collect::<Result<Vec<_>, GridError>>()?;
            cells.push(line);
        }
        Ok(Self {
            rows: rows.len(),
            cols: expected,
            cells,
        })
    }

    /// Distinct random cells among those still unblocked.
    fn place_blockers(&mut self, kind: Blocker, count: usize, factory: &mut TileFactory) {
        let mut free: Vec<Coord> = self.coords().filter(|&c| !self[c].is_blocked()).collect();
        for _ in 0..count.min(free.len()) {
            let at = free.swap_remove(factory.pick(free.len()));
            self[at].blocker = kind;
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn contains(&self, at: Coord) -> bool {
        at.row < self.rows && at.col < self.cols
    }

    #[inline]
    pub fn get(&self, at: Coord) -> Option<&Tile> {
        self.cells.get(at.row).and_then(|row| row.get(at.col))
    }

    #[inline]
    pub fn get_mut(&mut self, at: Coord) -> Option<&mut Tile> {
        self.cells.get_mut(at.row).and_then(|row| row.get_mut(at.col))
    }

    /// Places `tile` at `at`, rewriting its position. Out-of-bounds writes are ignored.
    pub fn set(&mut self, at: Coord, mut tile: Tile) {
        if let Some(slot) = self.get_mut(at) {
            tile.position = at;
            *slot = tile;
        }
    }

    /// Every coordinate, row-major.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let (rows, cols) = (self.rows, self.cols);
        (0..rows).flat_map(move |row| (0..cols).map(move |col| Coord::new(row, col)))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.cells.iter_mut().flatten()
    }

    /// The 3x3 block centred on `at` (including `at`), clipped to the board.
    pub fn block_around(&self, at: Coord) -> impl Iterator<Item = Coord> + use<> {
        let (rows, cols) = (self.rows, self.cols);
        let row_span = at.row.saturating_sub(1)..=(at.row + 1).min(rows.saturating_sub(1));
        let col_span = at.col.saturating_sub(1)..=(at.col + 1).min(cols.saturating_sub(1));
        row_span.flat_map(move |row| col_span.clone().map(move |col| Coord::new(row, col)))
    }

    /// Exchanges the candy identity (id, colour, special) of two cells.
    /// Blockers and positions stay where they are.
    pub fn swap_candies(&mut self, a: Coord, b: Coord) {
        if !self.contains(a) || !self.contains(b) || a == b {
            return;
        }
        let (ta, tb) = (self[a], self[b]);
        let first = &mut self[a];
        first.id = tb.id;
        first.color = tb.color;
        first.special = tb.special;
        let second = &mut self[b];
        second.id = ta.id;
        second.color = ta.color;
        second.special = ta.special;
    }

    pub fn count_blockers(&self, kind: Blocker) -> usize {
        self.tiles().filter(|t| t.blocker == kind).count()
    }
}

impl Index<Coord> for Grid {
    type Output = Tile;

    fn index(&self, at: Coord) -> &Tile {
        &self.cells[at.row][at.col]
    }
}

impl IndexMut<Coord> for Grid {
    fn index_mut(&mut self, at: Coord) -> &mut Tile {
        &mut self.cells[at.row][at.col]
    }
}

/// Random colour that does not complete a run of three with the two cells to the
/// left or the two cells above.
fn pick_fill_color(
    placed: &[Vec<Tile>],
    line: &[Tile],
    row: usize,
    col: usize,
    factory: &mut TileFactory,
) -> CandyColor {
    let forms_triple = |color: CandyColor| {
        let vertical = row >= 2 && placed[row - 1][col].color == color && placed[row - 2][col].color == color;
        let horizontal = col >= 2 && line[col - 1].color == color && line[col - 2].color == color;
        vertical || horizontal
    };
    for _ in 0..MAX_COLOR_DRAWS {
        let color = factory.random_color();
        if !forms_triple(color) {
            return color;
        }
    }
    warn!(row, col, "colour draw cap reached, falling back to first safe colour");
    CandyColor::ALL
        .into_iter()
        .find(|&c| !forms_triple(c))
        .unwrap_or(CandyColor::Red)
}
