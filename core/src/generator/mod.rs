use serde::{Deserialize, Serialize};

use crate::*;
pub use random::*;

mod random;

/// A filler value may appear at most this many times on a capped card.
const MAX_FILLER_REPEATS: u8 = 2;

pub trait GridGenerator {
    fn generate(
        &mut self,
        catalog: &SymbolCatalog,
        eligible_range: Option<ValueRange>,
        filler: FillerPolicy,
    ) -> Result<GeneratedGrid>;
}

/// How the six non-winning cells are drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillerPolicy {
    /// Uniform draws limited to values used fewer than twice, no secondary triple can appear.
    Capped,
    /// Independent uniform draws, a filler value can accidentally reach three copies.
    Unguarded,
}

impl FillerPolicy {
    /// Distinct filler values needed for the policy to produce a card.
    pub const fn required_filler_values(self) -> usize {
        match self {
            Self::Capped => (GRID_CELLS - WINNING_COUNT).div_ceil(MAX_FILLER_REPEATS as usize),
            Self::Unguarded => 2,
        }
    }
}

impl Default for FillerPolicy {
    fn default() -> Self {
        Self::Capped
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedGrid {
    pub grid: Grid,
    /// Prize amount recorded for the card.
    pub winning_value: Amount,
}
