use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::*;

/// Opaque token identifying a symbol's artwork.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub value: Amount,
}

impl Symbol {
    pub const fn new(id: u8, value: Amount) -> Self {
        Self {
            id: SymbolId(id),
            value,
        }
    }
}

const DEFAULT_VALUES: [Amount; 9] = [1, 2, 5, 10, 20, 50, 100, 200, 500];

/// Fixed set of symbols with distinct ids and distinct positive values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Symbol>", into = "Vec<Symbol>")]
pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
}

impl SymbolCatalog {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self> {
        if symbols.is_empty() {
            return Err(GameError::EmptyCatalog);
        }

        let mut ids = BTreeSet::new();
        let mut values = BTreeSet::new();
        for symbol in &symbols {
            if symbol.value == 0 {
                return Err(GameError::InvalidSymbolValue);
            }
            if !ids.insert(symbol.id) {
                return Err(GameError::DuplicateSymbolId(symbol.id.0));
            }
            if !values.insert(symbol.value) {
                return Err(GameError::DuplicateSymbolValue(symbol.value));
            }
        }

        Ok(Self { symbols })
    }

    /// Builds a catalog whose ids are the positions of `values`.
    pub fn from_values(values: &[Amount]) -> Result<Self> {
        let symbols = values
            .iter()
            .enumerate()
            .map(|(id, &value)| {
                u8::try_from(id)
                    .map(|id| Symbol::new(id, value))
                    .map_err(|_| GameError::InvalidConfig("catalog has too many symbols"))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(symbols)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn by_value(&self, value: Amount) -> Option<Symbol> {
        self.symbols.iter().copied().find(|s| s.value == value)
    }

    pub fn eligible(&self, range: Option<ValueRange>) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols
            .iter()
            .copied()
            .filter(move |s| range.is_none_or(|r| r.contains(s.value)))
    }

    pub fn excluding(&self, value: Amount) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols.iter().copied().filter(move |s| s.value != value)
    }

    /// Checks that every eligible winner leaves enough filler values behind.
    pub fn validate_for(&self, range: Option<ValueRange>, filler: FillerPolicy) -> Result<()> {
        let required = filler.required_filler_values();
        let mut any_eligible = false;
        for winner in self.eligible(range) {
            any_eligible = true;
            let distinct = self.excluding(winner.value).count();
            if distinct < required {
                return Err(GameError::DegenerateCatalog { distinct, required });
            }
        }

        if any_eligible {
            Ok(())
        } else {
            Err(GameError::NoEligibleSymbol)
        }
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        let symbols = DEFAULT_VALUES
            .iter()
            .zip(0..)
            .map(|(&value, id)| Symbol::new(id, value))
            .collect();
        Self { symbols }
    }
}

impl TryFrom<Vec<Symbol>> for SymbolCatalog {
    type Error = GameError;

    fn try_from(symbols: Vec<Symbol>) -> Result<Self> {
        Self::new(symbols)
    }
}

impl From<SymbolCatalog> for Vec<Symbol> {
    fn from(catalog: SymbolCatalog) -> Self {
        catalog.symbols
    }
}
