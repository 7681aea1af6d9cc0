//! Cascade engine: one detect -> clear -> collapse -> refill pass per [`Cascade::step`].
//!
//! A turn's resolution is a `Cascade` value stepped until it reports the board is
//! stable. Each step fully settles before the next detection, and nothing here
//! depends on wall-clock time: callers may pause between steps for presentation.

use crate::blockers::thaw_ice;
use crate::effects::detonation_range;
use crate::grid::{Coord, Grid};
use crate::matcher::{MatchGroup, find_matches};
use crate::tile::{CandyColor, Special, TileFactory};
use std::collections::HashSet;
use tracing::debug;

/// Score per cleared cell.
pub const POINTS_PER_TILE: u32 = 100;

/// Strength of the feedback signal a pass sends to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PraiseTier {
    Low = 1,
    Mid = 2,
    High = 3,
}

impl PraiseTier {
    pub fn level(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Praise {
    pub tier: PraiseTier,
    /// Voice is held back until the turn settles so only one line plays per turn.
    pub defer_voice: bool,
}

/// Feedback tier for a pass. Scoring never depends on it.
pub fn praise_tier(cascade: u32, matched: usize, special_triggered: bool) -> Option<PraiseTier> {
    if matched == 0 {
        None
    } else if cascade > 3 || matched > 8 {
        Some(PraiseTier::High)
    } else if special_triggered || cascade == 2 {
        Some(PraiseTier::Mid)
    } else if cascade == 1 {
        Some(PraiseTier::Low)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedSpecial {
    pub at: Coord,
    pub color: CandyColor,
    pub special: Special,
}

/// Everything one pass changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// 1 for the pass that follows the player's swap.
    pub cascade: u32,
    pub groups: Vec<MatchGroup>,
    /// Every cell removed this pass, sorted.
    pub cleared: Vec<Coord>,
    pub spawned: Vec<SpawnedSpecial>,
    pub score_delta: u32,
    pub ice_thawed: u32,
    pub special_triggered: bool,
    pub praise: Option<Praise>,
}

/// Resolution state of one player turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    count: u32,
    /// The swap's landing cell, preferred as spawn point by groups containing it.
    pivot: Option<Coord>,
    /// First pass clears the cells already marked on the board instead of detecting.
    forced: bool,
}

impl Cascade {
    /// Resolution of an ordinary swap that landed a candy on `pivot`.
    pub fn from_swap(pivot: Coord) -> Self {
        Self {
            count: 1,
            pivot: Some(pivot),
            forced: false,
        }
    }

    /// Resolution of a colour-bomb detonation whose cells are already marked matched.
    pub fn from_detonation() -> Self {
        Self {
            count: 1,
            pivot: None,
            forced: true,
        }
    }

    /// Runs one pass. `None` means the board is stable and the turn is over.
    ///
    /// Specials are placed after refill and replace whatever candy has fallen onto
    /// their cell, blocker included. Ice lost that way leaves the board without
    /// counting as thawed.
    pub fn step(&mut self, grid: &mut Grid, factory: &mut TileFactory) -> Option<PassReport> {
        let forced = std::mem::take(&mut self.forced);
        let groups = if forced { Vec::new() } else { find_matches(grid) };
        if groups.is_empty() && !forced {
            return None;
        }

        let mut matched: HashSet<Coord> = groups.iter().flat_map(|g| g.tiles.iter().copied()).collect();
        let mut special_triggered = false;
        let mut spawned = Vec::new();
        for group in groups.iter().filter(|g| g.special != Special::None) {
            let at = match self.pivot {
                Some(pivot) if group.tiles.contains(&pivot) => pivot,
                _ => group.pivot,
            };
            spawned.push(SpawnedSpecial {
                at,
                color: group.color,
                special: group.special,
            });
            special_triggered = true;
        }

        // One level of chaining: only specials in the detected groups go off.
        let mut direct: Vec<Coord> = matched.iter().copied().collect();
        direct.sort_unstable();
        for at in direct {
            let tile = grid[at];
            if !tile.has_special() || tile.is_matched {
                continue;
            }
            let range = detonation_range(&tile, grid);
            if !range.is_empty() {
                special_triggered = true;
                matched.extend(range);
            }
        }

        if forced {
            matched.extend(grid.tiles().filter(|t| t.is_matched).map(|t| t.position));
        }

        let mut cleared: Vec<Coord> = matched.into_iter().collect();
        cleared.sort_unstable();
        let tier = if forced {
            Some(PraiseTier::Mid)
        } else {
            praise_tier(self.count, cleared.len(), special_triggered)
        };
        let praise = tier.map(|tier| Praise {
            tier,
            defer_voice: self.count > 1,
        });

        for &at in &cleared {
            grid[at].is_matched = true;
        }
        let ice_thawed = thaw_ice(grid, &cleared);
        let score_delta = u32::try_from(cleared.len()).unwrap_or(u32::MAX).saturating_mul(POINTS_PER_TILE);

        collapse_and_refill(grid, factory);
        for spawn in &spawned {
            grid.set(spawn.at, factory.create_special(spawn.at, spawn.color, spawn.special));
        }

        debug!(
            cascade = self.count,
            cleared = cleared.len(),
            ice_thawed,
            spawned = spawned.len(),
            special_triggered,
            "cascade pass resolved"
        );
        let report = PassReport {
            cascade: self.count,
            groups,
            cleared,
            spawned,
            score_delta,
            ice_thawed,
            special_triggered,
            praise,
        };
        self.count += 1;
        self.pivot = None;
        Some(report)
    }
}

/// Drops surviving candies to the bottom of each column, keeping their order and
/// blockers, and tops the column up with new candies.
fn collapse_and_refill(grid: &mut Grid, factory: &mut TileFactory) {
    for tile in grid.tiles_mut() {
        tile.is_new = false;
    }
    let rows = grid.rows();
    for col in 0..grid.cols() {
        let survivors: Vec<_> = (0..rows)
            .rev()
            .map(|row| grid[Coord::new(row, col)])
            .filter(|tile| !tile.is_matched)
            .collect();
        let vacated = rows - survivors.len();
        for (depth, tile) in survivors.into_iter().enumerate() {
            grid.set(Coord::new(rows - 1 - depth, col), tile);
        }
        for row in 0..vacated {
            let at = Coord::new(row, col);
            let mut tile = factory.create(at, None);
            tile.is_new = true;
            grid.set(at, tile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Blocker;
    use rstest::rstest;
    use std::collections::HashSet;

    fn board(rows: &[&str], factory: &mut TileFactory) -> Grid {
        Grid::from_rows(rows, factory).unwrap()
    }

    /// 8x8 with no runs anywhere.
    const QUIET: [&str; 8] = [
        "GBYPOGBY", "BYPOGBYP", "YPOGBYPO", "POGBYPOG", "OGBYPOGB", "GBYPOGBY", "BYPOGBYP",
        "YPOGBYPO",
    ];

    fn quiet_with_row(row: usize, text: &str, factory: &mut TileFactory) -> Grid {
        let mut rows = QUIET;
        rows[row] = text;
        board(&rows, factory)
    }

    fn settle(cascade: &mut Cascade, grid: &mut Grid, factory: &mut TileFactory) -> Vec<PassReport> {
        let mut reports = Vec::new();
        while let Some(report) = cascade.step(grid, factory) {
            reports.push(report);
            assert!(reports.len() < 200, "cascade failed to settle");
        }
        reports
    }

    #[rstest]
    #[case(1, 3, false, Some(PraiseTier::Low))]
    #[case(1, 5, true, Some(PraiseTier::Mid))]
    #[case(2, 3, false, Some(PraiseTier::Mid))]
    #[case(3, 3, false, None)]
    #[case(4, 3, false, Some(PraiseTier::High))]
    #[case(1, 9, false, Some(PraiseTier::High))]
    #[case(1, 0, false, None)]
    fn praise_tiers(
        #[case] cascade: u32,
        #[case] matched: usize,
        #[case] special: bool,
        #[case] expected: Option<PraiseTier>,
    ) {
        assert_eq!(praise_tier(cascade, matched, special), expected);
    }

    #[test]
    fn stable_board_ends_immediately() {
        let mut factory = TileFactory::from_seed(0);
        let mut grid = board(&QUIET, &mut factory);
        let before = grid.clone();
        assert!(Cascade::from_swap(Coord::new(0, 0)).step(&mut grid, &mut factory).is_none());
        assert_eq!(grid, before);
    }

    #[test]
    fn three_in_a_row_scores_300_and_refills() {
        let mut factory = TileFactory::from_seed(5);
        let mut grid = quiet_with_row(3, "RRRBYPOG", &mut factory);
        let mut cascade = Cascade::from_swap(Coord::new(3, 1));
        let report = cascade.step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.cascade, 1);
        assert_eq!(report.cleared.len(), 3);
        assert_eq!(report.score_delta, 300);
        assert!(report.spawned.is_empty());
        assert!(!report.special_triggered);
        assert_eq!(
            report.praise,
            Some(Praise {
                tier: PraiseTier::Low,
                defer_voice: false
            })
        );
        // Columns 0..3 dropped one cell; the top cell of each is new.
        for col in 0..3 {
            assert!(grid[Coord::new(0, col)].is_new);
            assert_eq!(grid[Coord::new(3, col)].color, QUIET_COLOR_ABOVE[col]);
        }
        assert!(grid.tiles().all(|t| !t.is_matched));
        for at in grid.coords() {
            assert_eq!(grid[at].position, at);
        }
    }

    /// Colours of row 2 in `QUIET`, which fall into row 3.
    const QUIET_COLOR_ABOVE: [CandyColor; 3] = [CandyColor::Yellow, CandyColor::Purple, CandyColor::Orange];

    #[test]
    fn blockers_fall_with_their_candy() {
        let mut factory = TileFactory::from_seed(5);
        let mut grid = quiet_with_row(3, "RRRBYPOG", &mut factory);
        grid[Coord::new(1, 0)].blocker = Blocker::Lock;
        let locked_id = grid[Coord::new(1, 0)].id;
        Cascade::from_swap(Coord::new(3, 1)).step(&mut grid, &mut factory);
        assert_eq!(grid[Coord::new(2, 0)].id, locked_id);
        assert_eq!(grid[Coord::new(2, 0)].blocker, Blocker::Lock);
        assert_eq!(grid[Coord::new(1, 0)].blocker, Blocker::None);
    }

    #[test]
    fn four_spawns_striped_at_swap_landing_cell() {
        let mut factory = TileFactory::from_seed(8);
        let mut grid = quiet_with_row(7, "RRRRYPOG", &mut factory);
        let landing = Coord::new(7, 0);
        let report = Cascade::from_swap(landing).step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(report.spawned[0].at, landing);
        assert_eq!(grid[landing].special, Special::StripedVertical);
        assert_eq!(grid[landing].color, CandyColor::Red);
        assert_eq!(grid[landing].blocker, Blocker::None);
        assert!(grid[landing].is_new);
    }

    #[test]
    fn cascade_spawn_uses_computed_pivot() {
        let mut factory = TileFactory::from_seed(8);
        let mut grid = quiet_with_row(7, "RRRRYPOG", &mut factory);
        let report = Cascade::from_swap(Coord::new(0, 0)).step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.spawned[0].at, Coord::new(7, 2));
    }

    #[test]
    fn l_shape_spawns_one_wrapped_at_the_corner() {
        let mut factory = TileFactory::from_seed(21);
        let mut grid = quiet_with_row(0, "RRRPOGBY", &mut factory);
        grid[Coord::new(1, 0)].color = CandyColor::Red;
        grid[Coord::new(2, 0)].color = CandyColor::Red;
        let report = Cascade::from_swap(Coord::new(7, 7)).step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.cleared.len(), 5);
        assert_eq!(report.score_delta, 500);
        assert_eq!(
            report.spawned,
            vec![SpawnedSpecial {
                at: Coord::new(0, 0),
                color: CandyColor::Red,
                special: Special::Wrapped,
            }]
        );
        assert_eq!(grid[Coord::new(0, 0)].special, Special::Wrapped);
        assert_eq!(report.praise.map(|p| p.tier), Some(PraiseTier::Mid));
    }

    #[rstest]
    #[case::landing_cell_outside_the_run(Coord::new(0, 0), Coord::new(7, 3))]
    #[case::landing_cell_inside_the_run(Coord::new(7, 0), Coord::new(7, 0))]
    fn five_in_a_row_spawns_a_colour_bomb(#[case] landing: Coord, #[case] expected: Coord) {
        let mut factory = TileFactory::from_seed(8);
        let mut grid = quiet_with_row(7, "RRRRRPOG", &mut factory);
        let report = Cascade::from_swap(landing).step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.cleared.len(), 5);
        assert_eq!(report.score_delta, 500);
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(report.spawned[0].at, expected);
        assert_eq!(grid[expected].special, Special::ColorBomb);
        assert_eq!(grid[expected].color, CandyColor::Red);
    }

    #[test]
    fn matched_wrapped_candy_clears_its_clipped_block() {
        let mut factory = TileFactory::from_seed(13);
        let mut grid = quiet_with_row(0, "RRRBYPOG", &mut factory);
        grid[Coord::new(0, 0)].special = Special::Wrapped;
        let report = Cascade::from_swap(Coord::new(0, 2)).step(&mut grid, &mut factory).unwrap();
        assert!(report.special_triggered);
        assert_eq!(
            report.cleared,
            vec![
                Coord::new(0, 0),
                Coord::new(0, 1),
                Coord::new(0, 2),
                Coord::new(1, 0),
                Coord::new(1, 1),
            ]
        );
        assert_eq!(report.score_delta, 500);
    }

    #[test]
    fn matched_vertical_stripe_clears_its_column() {
        let mut factory = TileFactory::from_seed(13);
        let mut grid = quiet_with_row(4, "RRRBYPOG", &mut factory);
        grid[Coord::new(4, 1)].special = Special::StripedVertical;
        let report = Cascade::from_swap(Coord::new(4, 0)).step(&mut grid, &mut factory).unwrap();
        assert!(report.special_triggered);
        assert_eq!(report.cleared.len(), 10);
        assert!(report.cleared.iter().all(|c| c.col == 1 || c.row == 4));
        assert_eq!(report.score_delta, 1000);
        assert_eq!(report.praise.map(|p| p.tier), Some(PraiseTier::High));
    }

    #[test]
    fn spawned_special_replaces_an_iced_candy_that_fell_onto_it() {
        let mut factory = TileFactory::from_seed(6);
        let mut rows = QUIET;
        rows[4] = "RGBYPOGB";
        rows[5] = "RBYPOGBY";
        rows[6] = "RYPOGBYP";
        rows[7] = "RPOGBYPO";
        let mut grid = board(&rows, &mut factory);
        grid[Coord::new(0, 0)].blocker = Blocker::Ice;
        let iced = grid[Coord::new(0, 0)].id;
        let landing = Coord::new(4, 0);
        let report = Cascade::from_swap(landing).step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.ice_thawed, 0);
        assert_eq!(report.spawned[0].at, landing);
        assert_eq!(grid[landing].special, Special::StripedHorizontal);
        assert_eq!(grid[landing].blocker, Blocker::None);
        assert!(grid.tiles().all(|t| t.id != iced));
        assert_eq!(grid.count_blockers(Blocker::Ice), 0);
    }

    #[test]
    fn existing_striped_candy_chains_its_row() {
        let mut factory = TileFactory::from_seed(13);
        let mut grid = quiet_with_row(4, "RRRBYPOG", &mut factory);
        grid[Coord::new(4, 1)].special = Special::StripedHorizontal;
        let report = Cascade::from_swap(Coord::new(4, 0)).step(&mut grid, &mut factory).unwrap();
        assert!(report.special_triggered);
        assert_eq!(report.cleared.len(), 8);
        assert_eq!(report.score_delta, 800);
        assert_eq!(report.praise.map(|p| p.tier), Some(PraiseTier::Mid));
    }

    #[test]
    fn chaining_is_one_level_deep() {
        let mut factory = TileFactory::from_seed(13);
        let mut grid = quiet_with_row(4, "RRRBYPOG", &mut factory);
        // The striped candy clears row 4, which holds a wrapped candy at (4,6).
        // That wrapped candy was not part of a detected group, so it does not go off.
        grid[Coord::new(4, 1)].special = Special::StripedHorizontal;
        grid[Coord::new(4, 6)].special = Special::Wrapped;
        let report = Cascade::from_swap(Coord::new(4, 0)).step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.cleared.len(), 8);
        assert!(report.cleared.iter().all(|c| c.row == 4));
    }

    #[test]
    fn ice_next_to_a_match_thaws() {
        let mut factory = TileFactory::from_seed(2);
        let mut grid = quiet_with_row(4, "RRRBYPOG", &mut factory);
        grid[Coord::new(3, 3)].blocker = Blocker::Ice;
        grid[Coord::new(5, 1)].blocker = Blocker::Ice;
        grid[Coord::new(0, 7)].blocker = Blocker::Ice;
        let report = Cascade::from_swap(Coord::new(4, 1)).step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.ice_thawed, 2);
        assert_eq!(grid.count_blockers(Blocker::Ice), 1);
    }

    #[test]
    fn forced_pass_clears_marked_cells() {
        let mut factory = TileFactory::from_seed(3);
        let mut grid = board(&QUIET, &mut factory);
        let marked = [Coord::new(0, 0), Coord::new(5, 5), Coord::new(7, 2)];
        for at in marked {
            grid[at].is_matched = true;
        }
        let report = Cascade::from_detonation().step(&mut grid, &mut factory).unwrap();
        assert_eq!(report.cleared, marked.to_vec());
        assert_eq!(report.score_delta, 300);
        assert_eq!(report.praise.map(|p| p.tier), Some(PraiseTier::Mid));
    }

    #[test]
    fn later_passes_defer_voice() {
        let mut factory = TileFactory::from_seed(3);
        let mut grid = board(&QUIET, &mut factory);
        let mut cascade = Cascade {
            count: 2,
            pivot: None,
            forced: false,
        };
        grid[Coord::new(0, 0)].color = CandyColor::Red;
        grid[Coord::new(0, 1)].color = CandyColor::Red;
        grid[Coord::new(0, 2)].color = CandyColor::Red;
        let report = cascade.step(&mut grid, &mut factory).unwrap();
        assert_eq!(
            report.praise,
            Some(Praise {
                tier: PraiseTier::Mid,
                defer_voice: true
            })
        );
        assert_eq!(cascade.count, 3);
    }

    #[test]
    fn resolution_always_settles_to_a_matchless_board() {
        for seed in 0..100 {
            let mut factory = TileFactory::from_seed(seed);
            let mut grid = quiet_with_row(6, "RRRRRPOG", &mut factory);
            let mut cascade = Cascade::from_swap(Coord::new(6, 2));
            let reports = settle(&mut cascade, &mut grid, &mut factory);
            assert!(!reports.is_empty());
            assert!(find_matches(&grid).is_empty(), "seed {seed}");
            let ids: HashSet<_> = grid.tiles().map(|t| t.id).collect();
            assert_eq!(ids.len(), 64, "seed {seed}");
            for (i, report) in reports.iter().enumerate() {
                assert_eq!(report.cascade as usize, i + 1);
            }
        }
    }
}
