use core::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Currency amount in whole units.
pub type Amount = u32;

/// Index of one of the nine grid cells, row-major.
pub type CellIndex = u8;

/// Count type used for surface pixels.
pub type PixelCount = u32;

/// Backing surface size `(width, height)` in pixels.
pub type SurfaceSize = (u32, u32);

/// Number of cells on a card.
pub const GRID_CELLS: usize = 9;

/// Side length of the square grid.
pub const GRID_SIDE: CellIndex = 3;

/// How many copies of the winning symbol a card carries.
pub const WINNING_COUNT: usize = 3;

/// Inclusive value filter for the winning symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Amount,
    pub max: Amount,
}

impl ValueRange {
    pub const fn new(min: Amount, max: Amount) -> Self {
        Self { min, max }
    }

    pub const fn contains(&self, value: Amount) -> bool {
        self.min <= value && value <= self.max
    }
}

impl From<RangeInclusive<Amount>> for ValueRange {
    fn from(range: RangeInclusive<Amount>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}
