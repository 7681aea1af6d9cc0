//! Level configuration: the built-in campaign and `key = value` level files.

use crate::grid::{GridError, check_layout};
use std::path::Path;
use thiserror::Error;

/// Everything needed to start a level from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelConfig {
    pub rows: usize,
    pub cols: usize,
    pub moves: u32,
    pub target_score: u32,
    pub ice_count: usize,
    pub lock_count: usize,
    pub description: String,
}

impl LevelConfig {
    /// Rejects layouts that could never be initialised, before any game state exists.
    pub fn validate(&self) -> Result<(), LevelError> {
        check_layout(self.rows, self.cols, self.ice_count, self.lock_count)?;
        if self.moves == 0 {
            return Err(LevelError::NoMoves);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("no level {0} in this campaign")]
    UnknownLevel(u32),
    #[error("campaign has no levels")]
    Empty,
    #[error("level must allow at least one move")]
    NoMoves,
    #[error("invalid layout: {0}")]
    Grid(#[from] GridError),
}

/// Ordered list of levels played one after another. Level numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    levels: Vec<LevelConfig>,
}

impl Default for Campaign {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Campaign {
    /// The two shipped trials.
    pub fn builtin() -> Self {
        Self {
            levels: vec![
                LevelConfig {
                    rows: 8,
                    cols: 8,
                    moves: 12,
                    target_score: 2500,
                    ice_count: 12,
                    lock_count: 0,
                    description: "Trial of the First Chain: break through the frozen candies to weaken the magic."
                        .to_string(),
                },
                LevelConfig {
                    rows: 8,
                    cols: 8,
                    moves: 25,
                    target_score: 5000,
                    ice_count: 20,
                    lock_count: 6,
                    description: "The Final Challenge: clear the locks and ice to break the last chain."
                        .to_string(),
                },
            ],
        }
    }

    /// Campaign from explicit levels; every level is validated.
    pub fn from_levels(levels: Vec<LevelConfig>) -> Result<Self, LevelError> {
        if levels.is_empty() {
            return Err(LevelError::Empty);
        }
        for level in &levels {
            level.validate()?;
        }
        Ok(Self { levels })
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses a level file: a `[level]` header opens each level, followed by
    /// `key = value` lines. `#` starts a comment line.
    pub fn parse(text: &str) -> Result<Self, LevelError> {
        let mut levels = Vec::new();
        let mut current: Option<PartialLevel> = None;
        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "[level]" {
                if let Some(done) = current.take() {
                    levels.push(done.finish(line_no)?);
                }
                current = Some(PartialLevel::default());
                continue;
            }
            let Some(level) = current.as_mut() else {
                return Err(parse_error(line_no, "expected [level] before settings"));
            };
            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_error(line_no, "expected key = value"));
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            level.set(key.trim(), value, line_no)?;
        }
        if let Some(done) = current {
            levels.push(done.finish(text.lines().count())?);
        }
        Self::from_levels(levels)
    }

    pub fn get(&self, level: u32) -> Result<&LevelConfig, LevelError> {
        usize::try_from(level)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.levels.get(i))
            .ok_or(LevelError::UnknownLevel(level))
    }

    pub fn len(&self) -> u32 {
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelConfig> {
        self.levels.iter()
    }
}

fn parse_error(line: usize, message: &str) -> LevelError {
    LevelError::Parse {
        line,
        message: message.to_string(),
    }
}

#[derive(Debug, Default)]
struct PartialLevel {
    rows: Option<usize>,
    cols: Option<usize>,
    moves: Option<u32>,
    target_score: Option<u32>,
    ice_count: usize,
    lock_count: usize,
    description: String,
}

impl PartialLevel {
    fn set(&mut self, key: &str, value: &str, line: usize) -> Result<(), LevelError> {
        fn number<T: std::str::FromStr>(value: &str, line: usize) -> Result<T, LevelError> {
            value
                .parse()
                .map_err(|_| parse_error(line, &format!("not a number: {value}")))
        }
        match key {
            "rows" => self.rows = Some(number(value, line)?),
            "cols" => self.cols = Some(number(value, line)?),
            "moves" => self.moves = Some(number(value, line)?),
            "target_score" | "target" => self.target_score = Some(number(value, line)?),
            "ice" | "ice_count" => self.ice_count = number(value, line)?,
            "locks" | "lock_count" => self.lock_count = number(value, line)?,
            "description" => self.description = value.to_string(),
            other => return Err(parse_error(line, &format!("unknown key {other}"))),
        }
        Ok(())
    }

    fn finish(self, line: usize) -> Result<LevelConfig, LevelError> {
        let missing = |key: &str| parse_error(line, &format!("level is missing {key}"));
        Ok(LevelConfig {
            rows: self.rows.ok_or_else(|| missing("rows"))?,
            cols: self.cols.ok_or_else(|| missing("cols"))?,
            moves: self.moves.ok_or_else(|| missing("moves"))?,
            target_score: self.target_score.ok_or_else(|| missing("target_score"))?,
            ice_count: self.ice_count,
            lock_count: self.lock_count,
            description: self.description,
        })
    }
}
