//! Turn controller: gates player swaps, drives the cascade, and decides how the
//! level ends.
//!
//! A `GameState` is either idle (accepting swaps) or resolving a turn. Resolution
//! advances one cascade pass per [`GameState::step`], so a front-end can pace the
//! passes however it likes; [`GameState::settle`] runs them back to back.

use crate::blockers::can_swap;
use crate::cascade::{Cascade, PassReport, PraiseTier};
use crate::effects::color_sweep;
use crate::grid::{Coord, Grid};
use crate::level::{Campaign, LevelConfig, LevelError};
use crate::matcher::find_matches;
use crate::tile::{Blocker, CandyColor, Special, TileFactory};
use tracing::{info, trace};

/// Coarse session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Playing,
    /// Level cleared and more levels remain.
    Cinematic,
    GameOver,
    /// Final level cleared.
    Ending,
}

/// Why a swap attempt was ignored. Never an error: the board is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A previous turn is still resolving.
    Busy,
    NotPlaying,
    OutOfBounds,
    NotAdjacent,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    Rejected(Rejection),
    /// The swap formed no match and was undone; no move spent.
    Reverted,
    /// The swap formed a match; a move was spent and resolution has begun.
    Committed,
    /// A colour bomb went off; `marked` cells are queued for clearing.
    Detonated { color: CandyColor, marked: usize },
}

/// State handed to the presentation layer once a turn has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub grid: Grid,
    pub score: u32,
    pub moves: u32,
    pub ice_remaining: u32,
    pub status: Status,
    /// Passes that cleared something this turn.
    pub passes: u32,
    /// Deferred voice line to play now that the turn is over.
    pub voice: Option<PraiseTier>,
}

#[derive(Debug)]
pub enum Step {
    /// Nothing to resolve.
    Idle,
    Pass(PassReport),
    Settled(TurnReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Resolving(Cascade),
}

/// One play session on one level. Starting another level replaces it wholesale.
#[derive(Debug, Clone)]
pub struct GameState {
    campaign: Campaign,
    level: u32,
    config: LevelConfig,
    moves: u32,
    score: u32,
    ice_remaining: u32,
    grid: Grid,
    status: Status,
    chains_remaining: u32,
    phase: Phase,
    passes: u32,
    pending_voice: Option<PraiseTier>,
    factory: TileFactory,
}

impl GameState {
    /// Fresh session on `level` (1-based) of `campaign`.
    pub fn new(campaign: Campaign, level: u32, mut factory: TileFactory) -> Result<Self, LevelError> {
        let config = campaign.get(level)?.clone();
        config.validate()?;
        let grid = Grid::initialize(
            config.rows,
            config.cols,
            config.ice_count,
            config.lock_count,
            &mut factory,
        )?;
        let chains_remaining = campaign.len().saturating_sub(level - 1);
        info!(level, rows = config.rows, cols = config.cols, moves = config.moves, "level started");
        Ok(Self {
            moves: config.moves,
            ice_remaining: u32::try_from(config.ice_count).unwrap_or(u32::MAX),
            score: 0,
            status: Status::Playing,
            phase: Phase::Idle,
            passes: 0,
            pending_voice: None,
            campaign,
            level,
            config,
            grid,
            chains_remaining,
            factory,
        })
    }

    /// Replaces this session with a fresh one on `level`, keeping the campaign and
    /// the random stream.
    pub fn start_level(&mut self, level: u32) -> Result<(), LevelError> {
        let next = Self::new(self.campaign.clone(), level, self.factory.clone())?;
        *self = next;
        Ok(())
    }

    /// Moves on after a cleared level. Returns `false` when there is nowhere to go.
    pub fn advance_level(&mut self) -> Result<bool, LevelError> {
        if self.status != Status::Cinematic {
            return Ok(false);
        }
        self.start_level(self.level + 1)?;
        Ok(true)
    }

    pub fn restart_level(&mut self) -> Result<(), LevelError> {
        self.start_level(self.level)
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn target_score(&self) -> u32 {
        self.config.target_score
    }

    pub fn ice_remaining(&self) -> u32 {
        self.ice_remaining
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn chains_remaining(&self) -> u32 {
        self.chains_remaining
    }

    /// True while a turn is resolving; swaps are refused until it settles.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Resolving(_))
    }

    /// The only entry point that changes the board.
    pub fn attempt_swap(&mut self, from: Coord, to: Coord) -> SwapOutcome {
        let outcome = self.try_swap(from, to);
        if let SwapOutcome::Rejected(reason) = outcome {
            trace!(?from, ?to, ?reason, "swap rejected");
        }
        outcome
    }

    fn try_swap(&mut self, from: Coord, to: Coord) -> SwapOutcome {
        if self.is_busy() {
            return SwapOutcome::Rejected(Rejection::Busy);
        }
        if self.status != Status::Playing {
            return SwapOutcome::Rejected(Rejection::NotPlaying);
        }
        if !self.grid.contains(from) || !self.grid.contains(to) {
            return SwapOutcome::Rejected(Rejection::OutOfBounds);
        }
        if !from.is_adjacent(to) {
            return SwapOutcome::Rejected(Rejection::NotAdjacent);
        }
        if !can_swap(&self.grid, from) || !can_swap(&self.grid, to) {
            return SwapOutcome::Rejected(Rejection::Blocked);
        }

        let (a, b) = (self.grid[from], self.grid[to]);
        if a.special == Special::ColorBomb || b.special == Special::ColorBomb {
            let (bomb, color) = if a.special == Special::ColorBomb {
                (from, b.color)
            } else {
                (to, a.color)
            };
            let cells = color_sweep(&self.grid, bomb, color);
            for &at in &cells {
                self.grid[at].is_matched = true;
            }
            self.moves = self.moves.saturating_sub(1);
            self.begin(Cascade::from_detonation());
            return SwapOutcome::Detonated {
                color,
                marked: cells.len(),
            };
        }

        self.grid.swap_candies(from, to);
        if find_matches(&self.grid).is_empty() {
            self.grid.swap_candies(from, to);
            return SwapOutcome::Reverted;
        }
        self.moves = self.moves.saturating_sub(1);
        self.begin(Cascade::from_swap(to));
        SwapOutcome::Committed
    }

    fn begin(&mut self, cascade: Cascade) {
        self.passes = 0;
        self.pending_voice = None;
        self.phase = Phase::Resolving(cascade);
    }

    /// Advances the current turn by one pass.
    pub fn step(&mut self) -> Step {
        let Phase::Resolving(cascade) = &mut self.phase else {
            return Step::Idle;
        };
        if let Some(report) = cascade.step(&mut self.grid, &mut self.factory) {
            self.score = self.score.saturating_add(report.score_delta);
            self.ice_remaining = self.ice_remaining.saturating_sub(report.ice_thawed);
            self.passes += 1;
            if let Some(praise) = report.praise.filter(|p| p.defer_voice) {
                self.pending_voice = Some(praise.tier);
            }
            return Step::Pass(report);
        }
        self.phase = Phase::Idle;
        self.evaluate_status();
        Step::Settled(TurnReport {
            grid: self.grid.clone(),
            score: self.score,
            moves: self.moves,
            ice_remaining: self.ice_remaining,
            status: self.status,
            passes: self.passes,
            voice: self.pending_voice.take(),
        })
    }

    /// Runs the current turn to completion. `None` if no turn was in progress.
    pub fn settle(&mut self) -> Option<TurnReport> {
        loop {
            match self.step() {
                Step::Idle => return None,
                Step::Pass(_) => {}
                Step::Settled(report) => return Some(report),
            }
        }
    }

    fn evaluate_status(&mut self) {
        if self.score >= self.config.target_score && self.ice_remaining == 0 {
            let remaining = self.campaign.len().saturating_sub(self.level);
            self.status = if remaining > 0 { Status::Cinematic } else { Status::Ending };
            self.chains_remaining = remaining;
            info!(level = self.level, score = self.score, status = ?self.status, "level complete");
        } else if self.moves == 0 {
            self.status = Status::GameOver;
            info!(level = self.level, score = self.score, "out of moves");
        }
    }

    /// Ice cells currently on the board, as opposed to the objective counter.
    pub fn ice_on_board(&self) -> usize {
        self.grid.count_blockers(Blocker::Ice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// 8x8 with no runs; every colour cycles G B Y P O along rows and columns.
    const QUIET: [&str; 8] = [
        "GBYPOGBY", "BYPOGBYP", "YPOGBYPO", "POGBYPOG", "OGBYPOGB", "GBYPOGBY", "BYPOGBYP",
        "YPOGBYPO",
    ];

    fn single_level(moves: u32, target_score: u32, ice_count: usize) -> Campaign {
        Campaign::from_levels(vec![LevelConfig {
            rows: 8,
            cols: 8,
            moves,
            target_score,
            ice_count,
            lock_count: 0,
            description: String::new(),
        }])
        .unwrap()
    }

    /// Session whose board is replaced by a fixture; ice objective follows the fixture.
    fn session(campaign: Campaign, rows: &[&str]) -> GameState {
        let mut state = GameState::new(campaign, 1, TileFactory::from_seed(17)).unwrap();
        state.grid = Grid::from_rows(rows, &mut state.factory).unwrap();
        state.ice_remaining = 0;
        state
    }

    fn with_row(row: usize, text: &'static str) -> [&'static str; 8] {
        let mut rows = QUIET;
        rows[row] = text;
        rows
    }

    #[test]
    fn new_session_starts_playing() {
        let state = GameState::new(Campaign::builtin(), 1, TileFactory::from_seed(1)).unwrap();
        assert_eq!(state.status(), Status::Playing);
        assert_eq!(state.moves(), 12);
        assert_eq!(state.score(), 0);
        assert_eq!(state.ice_remaining(), 12);
        assert_eq!(state.ice_on_board(), 12);
        assert_eq!(state.chains_remaining(), 2);
        assert!(find_matches(state.grid()).is_empty());
    }

    #[test]
    fn unknown_level_is_an_error() {
        assert!(matches!(
            GameState::new(Campaign::builtin(), 9, TileFactory::from_seed(1)),
            Err(LevelError::UnknownLevel(9))
        ));
    }

    #[test]
    fn invalid_targets_are_rejected_without_cost() {
        let mut state = session(single_level(5, 10_000, 0), &QUIET);
        state.grid[Coord::new(3, 3)].blocker = Blocker::Lock;
        let before = state.grid.clone();
        let cases = [
            (Coord::new(0, 0), Coord::new(0, 2), Rejection::NotAdjacent),
            (Coord::new(0, 0), Coord::new(1, 1), Rejection::NotAdjacent),
            (Coord::new(0, 7), Coord::new(0, 8), Rejection::OutOfBounds),
            (Coord::new(3, 2), Coord::new(3, 3), Rejection::Blocked),
            (Coord::new(3, 3), Coord::new(4, 3), Rejection::Blocked),
        ];
        for (from, to, reason) in cases {
            assert_eq!(state.attempt_swap(from, to), SwapOutcome::Rejected(reason));
        }
        assert_eq!(state.grid, before);
        assert_eq!(state.moves(), 5);
    }

    #[test]
    fn non_matching_swap_reverts_exactly() {
        let mut state = session(single_level(5, 10_000, 0), &QUIET);
        let before = state.grid.clone();
        assert_eq!(
            state.attempt_swap(Coord::new(0, 0), Coord::new(0, 1)),
            SwapOutcome::Reverted
        );
        assert_eq!(state.grid, before);
        assert_eq!(state.moves(), 5);
        assert!(!state.is_busy());
    }

    #[test]
    fn swap_completing_three_scores_300() {
        // Row 3 reads R R B R ...; swapping (3,2) with (3,3) gives R R R B.
        let rows = with_row(3, "RRBRYPOG");
        let mut state = session(single_level(5, 10_000, 0), &rows);
        let outcome = state.attempt_swap(Coord::new(3, 3), Coord::new(3, 2));
        assert_eq!(outcome, SwapOutcome::Committed);
        assert_eq!(state.moves(), 4);
        assert!(state.is_busy());
        assert_eq!(
            state.attempt_swap(Coord::new(0, 0), Coord::new(0, 1)),
            SwapOutcome::Rejected(Rejection::Busy)
        );
        let Step::Pass(first) = state.step() else {
            panic!("expected a pass");
        };
        assert_eq!(first.groups.len(), 1);
        assert_eq!(first.groups[0].special, Special::None);
        assert_eq!(first.groups[0].tiles.len(), 3);
        assert_eq!(first.score_delta, 300);
        assert!(first.spawned.is_empty());
        let report = state.settle().unwrap();
        assert!(report.score >= 300);
        assert_eq!(report.score % 100, 0);
        assert_eq!(report.moves, 4);
        assert_eq!(report.status, Status::Playing);
        assert!(!state.is_busy());
        assert!(find_matches(state.grid()).is_empty());
    }

    #[test]
    fn colour_bomb_clears_every_candy_of_the_colour() {
        // Ten reds scattered over a quiet board, plus a bomb next to one of them.
        let mut state = session(single_level(5, 100_000, 0), &QUIET);
        let reds = [
            (0, 0),
            (0, 3),
            (1, 6),
            (2, 1),
            (3, 4),
            (4, 7),
            (5, 2),
            (6, 5),
            (7, 0),
            (7, 7),
        ];
        for (row, col) in reds {
            state.grid[Coord::new(row, col)].color = CandyColor::Red;
        }
        let bomb = Coord::new(4, 4);
        state.grid[bomb].special = Special::ColorBomb;
        state.grid[bomb].color = CandyColor::Green;
        assert!(find_matches(&state.grid).is_empty());

        let outcome = state.attempt_swap(bomb, Coord::new(3, 4));
        assert_eq!(
            outcome,
            SwapOutcome::Detonated {
                color: CandyColor::Red,
                marked: 11
            }
        );
        assert_eq!(state.moves(), 4);
        let Step::Pass(pass) = state.step() else {
            panic!("expected the detonation pass");
        };
        assert_eq!(pass.cleared.len(), 11);
        assert_eq!(pass.score_delta, 1100);
        assert_eq!(pass.praise.map(|p| p.tier), Some(PraiseTier::Mid));
        assert!(state.settle().is_some());
    }

    #[test]
    fn match_beside_ice_thaws_two_bystanders() {
        let rows = with_row(3, "RRBRYPOG");
        let mut state = session(single_level(5, 100_000, 2), &rows);
        state.grid[Coord::new(2, 0)].blocker = Blocker::Ice;
        state.grid[Coord::new(4, 3)].blocker = Blocker::Ice;
        state.ice_remaining = 2;
        assert_eq!(
            state.attempt_swap(Coord::new(3, 3), Coord::new(3, 2)),
            SwapOutcome::Committed
        );
        let Step::Pass(pass) = state.step() else {
            panic!("expected a pass");
        };
        assert_eq!(pass.ice_thawed, 2);
        assert_eq!(state.ice_remaining(), 0);
    }

    #[test]
    fn ice_buried_under_a_new_special_stays_in_the_objective() {
        let mut rows = QUIET;
        rows[4] = "RGBYPOGB";
        rows[5] = "RBYPOGBY";
        rows[6] = "BRPOGBYP";
        rows[7] = "RPOGBYPO";
        let mut state = session(single_level(5, 100_000, 1), &rows);
        // Column 0 drops four cells, carrying this ice onto the swap's landing cell.
        state.grid[Coord::new(2, 0)].blocker = Blocker::Ice;
        state.ice_remaining = 1;
        assert_eq!(
            state.attempt_swap(Coord::new(6, 1), Coord::new(6, 0)),
            SwapOutcome::Committed
        );
        let Step::Pass(pass) = state.step() else {
            panic!("expected a pass");
        };
        assert_eq!(pass.ice_thawed, 0);
        assert_eq!(state.grid()[Coord::new(6, 0)].special, Special::StripedHorizontal);
        assert_eq!(state.ice_on_board(), 0);
        let report = state.settle().unwrap();
        assert_eq!(report.ice_remaining, 1);
        assert_eq!(report.status, Status::Playing);
    }

    #[test]
    fn reaching_target_with_no_ice_ends_the_last_level() {
        let rows = with_row(3, "RRBRYPOG");
        let mut state = session(single_level(5, 300, 0), &rows);
        state.attempt_swap(Coord::new(3, 3), Coord::new(3, 2));
        let report = state.settle().unwrap();
        assert_eq!(report.status, Status::Ending);
        assert_eq!(state.chains_remaining(), 0);
        assert_eq!(
            state.attempt_swap(Coord::new(0, 0), Coord::new(0, 1)),
            SwapOutcome::Rejected(Rejection::NotPlaying)
        );
    }

    #[test]
    fn clearing_level_one_leads_to_the_next() {
        let mut state = GameState::new(Campaign::builtin(), 1, TileFactory::from_seed(4)).unwrap();
        state.grid = Grid::from_rows(&with_row(3, "RRBRYPOG"), &mut state.factory).unwrap();
        state.ice_remaining = 0;
        state.score = 2400;
        state.attempt_swap(Coord::new(3, 3), Coord::new(3, 2));
        let report = state.settle().unwrap();
        assert_eq!(report.status, Status::Cinematic);
        assert_eq!(state.chains_remaining(), 1);

        assert!(state.advance_level().unwrap());
        assert_eq!(state.level(), 2);
        assert_eq!(state.status(), Status::Playing);
        assert_eq!(state.score(), 0);
        assert_eq!(state.moves(), 25);
        assert_eq!(state.ice_remaining(), 20);
        assert_eq!(state.chains_remaining(), 1);
        assert!(!state.advance_level().unwrap());
    }

    #[test]
    fn last_move_without_target_is_game_over() {
        let rows = with_row(3, "RRBRYPOG");
        let mut state = session(single_level(1, 100_000, 0), &rows);
        state.attempt_swap(Coord::new(3, 3), Coord::new(3, 2));
        let report = state.settle().unwrap();
        assert_eq!(report.status, Status::GameOver);
        assert_eq!(report.moves, 0);
        state.restart_level().unwrap();
        assert_eq!(state.status(), Status::Playing);
        assert_eq!(state.moves(), 1);
    }

    #[test]
    fn settled_turns_keep_the_board_whole() {
        for seed in 0..40 {
            let mut state =
                GameState::new(Campaign::builtin(), 2, TileFactory::from_seed(seed)).unwrap();
            let mut turns = 0;
            'play: while state.status() == Status::Playing && turns < 25 {
                let coords: Vec<Coord> = state.grid().coords().collect();
                for from in coords {
                    for to in [Coord::new(from.row, from.col + 1), Coord::new(from.row + 1, from.col)] {
                        match state.attempt_swap(from, to) {
                            SwapOutcome::Committed | SwapOutcome::Detonated { .. } => {
                                let report = state.settle().unwrap();
                                assert!(report.passes >= 1);
                                let ids: HashSet<_> = report.grid.tiles().map(|t| t.id).collect();
                                assert_eq!(ids.len(), 64, "seed {seed}");
                                for at in report.grid.coords() {
                                    assert_eq!(report.grid[at].position, at);
                                }
                                assert!(find_matches(&report.grid).is_empty());
                                turns += 1;
                                continue 'play;
                            }
                            _ => {}
                        }
                    }
                }
                break;
            }
        }
    }
}
