//! Tiles: candy colour, special kind, blocker overlay, and the factory that mints them.

use crate::grid::Coord;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// The six-colour candy palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CandyColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
}

impl CandyColor {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Purple,
        Self::Orange,
    ];

    /// Palette index 0..6, used by the theme.
    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Purple => 4,
            Self::Orange => 5,
        }
    }

    /// One-letter code used by board fixtures.
    pub fn letter(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Blue => 'B',
            Self::Green => 'G',
            Self::Yellow => 'Y',
            Self::Purple => 'P',
            Self::Orange => 'O',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|color| color.letter() == c.to_ascii_uppercase())
    }
}

/// Area-of-effect behaviour a candy carries. At most one per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Special {
    #[default]
    None,
    /// Clears its whole row when detonated.
    StripedHorizontal,
    /// Clears its whole column when detonated.
    StripedVertical,
    /// Clears the 3x3 block around it.
    Wrapped,
    /// Swapped with any candy, clears every candy of that colour.
    ColorBomb,
}

/// Obstruction overlaid on a cell; independent of the candy underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Blocker {
    #[default]
    None,
    Ice,
    Lock,
}

/// Stable identity of a tile for its whole lifetime on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(u64);

/// One cell's candy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub color: CandyColor,
    pub special: Special,
    pub blocker: Blocker,
    /// Always equals the tile's index in the grid; maintained by `Grid::set`.
    pub position: Coord,
    /// Marked for clearing in the pass currently being resolved.
    pub is_matched: bool,
    /// Dropped in by the latest refill (entry animation hint only).
    pub is_new: bool,
}

impl Tile {
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.blocker != Blocker::None
    }

    #[inline]
    pub fn has_special(&self) -> bool {
        self.special != Special::None
    }
}

/// Mints tiles: fresh ids plus every random draw the engine makes.
///
/// Seeded factories replay a session exactly; `from_entropy` is for play.
#[derive(Debug, Clone)]
pub struct TileFactory {
    rng: SmallRng,
    next_id: u64,
}

impl TileFactory {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            next_id: 0,
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
            next_id: 0,
        }
    }

    pub fn random_color(&mut self) -> CandyColor {
        CandyColor::ALL[self.rng.random_range(0..CandyColor::ALL.len())]
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    fn next_id(&mut self) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Plain candy with the given colour, or a random one.
    pub fn create(&mut self, position: Coord, color: Option<CandyColor>) -> Tile {
        let color = color.unwrap_or_else(|| self.random_color());
        Tile {
            id: self.next_id(),
            color,
            special: Special::None,
            blocker: Blocker::None,
            position,
            is_matched: false,
            is_new: false,
        }
    }

    /// Freshly spawned special candy; never carries a blocker.
    pub fn create_special(&mut self, position: Coord, color: CandyColor, special: Special) -> Tile {
        Tile {
            special,
            is_new: true,
            ..self.create(position, Some(color))
        }
    }
}
