use thiserror::Error;

use crate::Amount;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Insufficient funds: balance {balance} is below the wager of {cost}")]
    InsufficientFunds { balance: Amount, cost: Amount },
    #[error("Gesture received outside of scratching")]
    InvalidGestureState,
    #[error("Catalog leaves {distinct} distinct filler values, at least {required} are needed")]
    DegenerateCatalog { distinct: usize, required: usize },
    #[error("No catalog symbol falls in the eligible prize range")]
    NoEligibleSymbol,
    #[error("Symbol catalog is empty")]
    EmptyCatalog,
    #[error("Symbol value {0} appears more than once in the catalog")]
    DuplicateSymbolValue(Amount),
    #[error("Symbol id {0} appears more than once in the catalog")]
    DuplicateSymbolId(u8),
    #[error("Symbol values must be positive")]
    InvalidSymbolValue,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("Configuration could not be parsed")]
    ConfigParse,
    #[error("Operation not allowed in the current session state")]
    InvalidState,
}

pub type Result<T> = core::result::Result<T, GameError>;
