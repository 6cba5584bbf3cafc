use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub won: bool,
    /// Prize amount, 0 when the card lost.
    pub value: Amount,
    pub winning_cells: Option<[CellIndex; WINNING_COUNT]>,
}

impl Outcome {
    pub const LOST: Self = Self {
        won: false,
        value: 0,
        winning_cells: None,
    };

    pub fn is_winning_cell(&self, index: CellIndex) -> bool {
        self.winning_cells
            .is_some_and(|cells| cells.contains(&index))
    }
}

struct ValueGroup {
    value: Amount,
    cells: SmallVec<[CellIndex; GRID_CELLS]>,
}

/// Find the value that occupies exactly three cells.
///
/// Values are grouped in order of their first appearance on the card, so when several values form a triple the one
/// seen first wins.
pub fn evaluate(grid: &Grid) -> Outcome {
    let mut groups: SmallVec<[ValueGroup; GRID_CELLS]> = SmallVec::new();
    for (index, symbol) in grid.iter_indexed() {
        match groups.iter_mut().find(|group| group.value == symbol.value) {
            Some(group) => group.cells.push(index),
            None => groups.push(ValueGroup {
                value: symbol.value,
                cells: SmallVec::from_slice(&[index]),
            }),
        }
    }

    groups
        .iter()
        .find(|group| group.cells.len() == WINNING_COUNT)
        .map(|group| Outcome {
            won: true,
            value: group.value,
            winning_cells: Some([group.cells[0], group.cells[1], group.cells[2]]),
        })
        .unwrap_or(Outcome::LOST)
}
