//! What an active special candy takes with it when it is cleared.

use crate::grid::{Coord, Grid};
use crate::tile::{CandyColor, Special, Tile};

/// Extra cells detonated by `tile`'s special. Colour bombs return nothing here;
/// they only go off when swapped (see [`color_sweep`]).
pub fn detonation_range(tile: &Tile, grid: &Grid) -> Vec<Coord> {
    let at = tile.position;
    match tile.special {
        Special::StripedHorizontal => (0..grid.cols()).map(|col| Coord::new(at.row, col)).collect(),
        Special::StripedVertical => (0..grid.rows()).map(|row| Coord::new(row, at.col)).collect(),
        Special::Wrapped => grid.block_around(at).collect(),
        Special::ColorBomb | Special::None => Vec::new(),
    }
}

/// Cells cleared by swapping the bomb at `bomb` with a candy of `color`:
/// every candy of that colour plus the bomb itself.
pub fn color_sweep(grid: &Grid, bomb: Coord, color: CandyColor) -> Vec<Coord> {
    let mut cells: Vec<Coord> = grid.coords().filter(|&c| grid[c].color == color).collect();
    if !cells.contains(&bomb) {
        cells.push(bomb);
    }
    cells
}
