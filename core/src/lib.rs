#![no_std]

extern crate alloc;

use core::ops::Index;
use serde::{Deserialize, Serialize};
use web_time::Duration;

pub use coverage::*;
pub use deferred::*;
pub use error::*;
pub use generator::*;
pub use gesture::*;
pub use outcome::*;
pub use session::*;
pub use symbol::*;
pub use types::*;

mod coverage;
mod deferred;
mod error;
mod generator;
mod gesture;
mod outcome;
mod session;
mod symbol;
mod types;

/// What happens after a prize is collected while cards remain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuePolicy {
    /// Every card waits for an explicit `start_card`.
    Manual,
    /// The first card waits for the player, later cards are wagered automatically when the balance allows.
    AutoAfterFirst,
}

impl Default for ContinuePolicy {
    fn default() -> Self {
        Self::AutoAfterFirst
    }
}

/// When coverage is recomputed after strokes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecomputePolicy {
    EveryStroke,
    /// Strokes only raise a request, drained by the next frame tick.
    PerFrame,
}

impl Default for RecomputePolicy {
    fn default() -> Self {
        Self::EveryStroke
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub wager_cost: Amount,
    pub cards_per_session: u32,
    pub starting_balance: Amount,
    /// Percentage of the cover that must be erased before the card resolves.
    pub reveal_threshold: f64,
    pub eligible_range: Option<ValueRange>,
    /// Brush radius in displayed pixels.
    pub brush_radius: f64,
    pub popup_delay_ms: u32,
    pub continue_policy: ContinuePolicy,
    pub filler_policy: FillerPolicy,
    pub recompute_policy: RecomputePolicy,
}

impl GameConfig {
    pub const DEFAULT_THRESHOLD: f64 = 65.0;

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            log::warn!("Invalid game configuration: {}", err);
            GameError::ConfigParse
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.wager_cost == 0 {
            return Err(GameError::InvalidConfig("wager cost must be positive"));
        }
        if self.cards_per_session == 0 {
            return Err(GameError::InvalidConfig("a session needs at least one card"));
        }
        if !(self.reveal_threshold > 0.0 && self.reveal_threshold <= 100.0) {
            return Err(GameError::InvalidConfig("reveal threshold must be in (0, 100]"));
        }
        if !(self.brush_radius.is_finite() && self.brush_radius > 0.0) {
            return Err(GameError::InvalidConfig("brush radius must be positive"));
        }
        if let Some(range) = self.eligible_range {
            if range.min > range.max {
                return Err(GameError::InvalidConfig("eligible range is empty"));
            }
        }
        Ok(())
    }

    pub fn popup_delay(&self) -> Duration {
        Duration::from_millis(self.popup_delay_ms.into())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            wager_cost: 10,
            cards_per_session: 5,
            starting_balance: 50,
            reveal_threshold: Self::DEFAULT_THRESHOLD,
            eligible_range: Some(ValueRange::new(50, 200)),
            brush_radius: 18.0,
            popup_delay_ms: 800,
            continue_policy: Default::default(),
            filler_policy: Default::default(),
            recompute_policy: Default::default(),
        }
    }
}

/// The nine symbols of one card, row-major.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: [Symbol; GRID_CELLS],
}

impl Grid {
    pub const fn from_cells(cells: [Symbol; GRID_CELLS]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Symbol; GRID_CELLS] {
        &self.cells
    }

    pub fn iter_indexed(&self) -> impl Iterator<Item = (CellIndex, Symbol)> + '_ {
        (0..).zip(self.cells.iter().copied())
    }

    pub fn count_of(&self, value: Amount) -> usize {
        self.cells.iter().filter(|s| s.value == value).count()
    }

    pub fn evaluate(&self) -> Outcome {
        evaluate(self)
    }
}

impl Index<CellIndex> for Grid {
    type Output = Symbol;

    fn index(&self, index: CellIndex) -> &Self::Output {
        &self.cells[usize::from(index)]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeOutcome {
    /// The session was not scratching.
    Ignored,
    NoChange,
    Erased,
    /// The stroke crossed the reveal threshold and resolved the card.
    Revealed,
}

impl StrokeOutcome {
    pub const fn has_update(self) -> bool {
        use StrokeOutcome::*;
        match self {
            Ignored => false,
            NoChange => false,
            Erased => true,
            Revealed => true,
        }
    }
}
