//! Common types used throughout Ride the Bus.
//!
//! `game` holds the data model (cards, decks, attempts, wallet records);
//! `api` holds the JSON shapes exchanged with players, the payment webhook,
//! and the settlement relay.

pub mod api;
pub mod game;

pub use api::ErrorKind;
