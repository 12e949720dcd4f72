//! Game domain types.
//!
//! Defines cards, decks, attempts and per-wallet records used by the execution
//! layer and the service.

mod attempt;
mod card;
mod constants;
mod player;

pub use attempt::*;
pub use card::*;
pub use constants::*;
pub use player::*;

#[cfg(test)]
mod tests;
