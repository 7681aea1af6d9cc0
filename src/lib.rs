//! Match-3 puzzle engine.
//!
//! The board is a [`Grid`] of [`Tile`]s. A player turn goes through
//! [`GameState::attempt_swap`] and resolves as a [`Cascade`] of detect, clear,
//! collapse and refill passes until no run of three remains. Levels come from a
//! [`Campaign`], either the built-in one or a level file.

pub mod blockers;
pub mod cascade;
pub mod effects;
pub mod grid;
pub mod level;
pub mod matcher;
pub mod tile;
pub mod turn;

pub use cascade::{Cascade, PassReport, Praise, PraiseTier};
pub use grid::{Coord, Grid, GridError};
pub use level::{Campaign, LevelConfig, LevelError};
pub use matcher::{MatchGroup, find_matches};
pub use tile::{Blocker, CandyColor, Special, Tile, TileFactory, TileId};
pub use turn::{GameState, Rejection, Status, Step, SwapOutcome, TurnReport};
