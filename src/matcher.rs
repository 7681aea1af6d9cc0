//! Match detection: straight runs of three or more, T/L intersections, and the
//! special candy each group earns.

use crate::grid::{Coord, Grid};
use crate::tile::{CandyColor, Special};

/// Shortest run that clears.
pub const MIN_RUN: usize = 3;

/// A set of cells cleared together, with the special it spawns (if any) and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub tiles: Vec<Coord>,
    pub color: CandyColor,
    pub special: Special,
    pub pivot: Coord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Horizontal,
    Vertical,
}

/// Special earned by a straight run that did not take part in an intersection.
/// Horizontal fours strike vertically and vice versa.
fn classify_run(len: usize, orientation: Orientation) -> Special {
    match (len, orientation) {
        (4, Orientation::Horizontal) => Special::StripedVertical,
        (4, Orientation::Vertical) => Special::StripedHorizontal,
        (n, _) if n >= 5 => Special::ColorBomb,
        _ => Special::None,
    }
}

/// Walks one line of cells and records every run of `MIN_RUN`+ equal colours.
///
/// Runs are listed from the cell that ended the run backwards, so `run[1]` is the
/// neighbour of the run's far end.
fn scan_line(grid: &Grid, line: &[Coord], runs: &mut Vec<Vec<Coord>>) {
    let mut count = 1;
    for i in 0..line.len() {
        let continues = i + 1 < line.len() && grid[line[i]].color == grid[line[i + 1]].color;
        if continues {
            count += 1;
            continue;
        }
        if count >= MIN_RUN {
            runs.push((0..count).map(|k| line[i - k]).collect());
        }
        count = 1;
    }
}

fn horizontal_runs(grid: &Grid) -> Vec<Vec<Coord>> {
    let mut runs = Vec::new();
    for row in 0..grid.rows() {
        let line: Vec<Coord> = (0..grid.cols()).map(|col| Coord::new(row, col)).collect();
        scan_line(grid, &line, &mut runs);
    }
    runs
}

fn vertical_runs(grid: &Grid) -> Vec<Vec<Coord>> {
    let mut runs = Vec::new();
    for col in 0..grid.cols() {
        let line: Vec<Coord> = (0..grid.rows()).map(|row| Coord::new(row, col)).collect();
        scan_line(grid, &line, &mut runs);
    }
    runs
}

fn straight_group(grid: &Grid, run: Vec<Coord>, orientation: Orientation) -> MatchGroup {
    MatchGroup {
        color: grid[run[0]].color,
        special: classify_run(run.len(), orientation),
        pivot: run[1],
        tiles: run,
    }
}

/// Every match on the board, intersections first, then leftover horizontal runs,
/// then leftover vertical runs.
///
/// Each horizontal run is paired against each vertical run in order; the first
/// pair sharing a cell becomes a wrapped group and consumes both runs, so a run
/// crossing several others only ever joins one intersection.
pub fn find_matches(grid: &Grid) -> Vec<MatchGroup> {
    let horizontal = horizontal_runs(grid);
    let vertical = vertical_runs(grid);
    let mut used_h = vec![false; horizontal.len()];
    let mut used_v = vec![false; vertical.len()];
    let mut groups = Vec::new();

    for (hi, h_run) in horizontal.iter().enumerate() {
        for (vi, v_run) in vertical.iter().enumerate() {
            if used_h[hi] || used_v[vi] {
                continue;
            }
            let Some(&shared) = h_run.iter().find(|c| v_run.contains(c)) else {
                continue;
            };
            used_h[hi] = true;
            used_v[vi] = true;
            let tiles = h_run
                .iter()
                .copied()
                .chain(v_run.iter().copied().filter(|&c| c != shared))
                .collect();
            groups.push(MatchGroup {
                tiles,
                color: grid[shared].color,
                special: Special::Wrapped,
                pivot: shared,
            });
        }
    }

    for (run, _) in horizontal.into_iter().zip(used_h).filter(|(_, used)| !used) {
        groups.push(straight_group(grid, run, Orientation::Horizontal));
    }
    for (run, _) in vertical.into_iter().zip(used_v).filter(|(_, used)| !used) {
        groups.push(straight_group(grid, run, Orientation::Vertical));
    }
    groups
}
