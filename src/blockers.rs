//! Blocker interaction: ice thaws next to clears, locks only leave with their candy.

use crate::grid::{Coord, Grid};
use crate::tile::Blocker;

/// Removes ice from every cell in the 3x3 block around each cleared cell and
/// returns how many cells thawed. Bystanders thaw even when they are not cleared.
pub fn thaw_ice(grid: &mut Grid, cleared: &[Coord]) -> u32 {
    let mut thawed = 0;
    for &at in cleared {
        for near in grid.block_around(at) {
            let tile = &mut grid[near];
            if tile.blocker == Blocker::Ice {
                tile.blocker = Blocker::None;
                thawed += 1;
            }
        }
    }
    thawed
}

/// Whether a cell may take part in a swap, as source or target.
pub fn can_swap(grid: &Grid, at: Coord) -> bool {
    grid.get(at).is_some_and(|tile| !tile.is_blocked())
}
