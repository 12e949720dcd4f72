//! Ride the Bus game core.
//!
//! This crate holds the deterministic rules of the game: seeded decks, the
//! per-player phase state machine, the population guess round, tiering,
//! payouts and settlement planning. It performs no I/O; the server owns
//! storage, locking and the network.
//!
//! ## Determinism requirements
//! - Shuffles derive only from the player's stored seed.
//! - No wall-clock time.
//! - Payout math is integer-only with floor division.
//!
//! ## Atomicity
//! Operations taking `&mut WalletRecord` leave it untouched when they return
//! `Err`. Callers hand in a clone and commit it on `Ok`.
//!
//! ## Example
//! ```rust
//! use ridethebus_execution::{PhaseMachine, step::Choice};
//! use ridethebus_types::game::{GamePhase, Step, WalletRecord};
//!
//! let machine = PhaseMachine::default();
//! let mut record = WalletRecord::new("wallet", 42, 0);
//! let choice = Choice::parse(Step::RedBlack, "RED").unwrap();
//! let outcome = machine
//!     .play_step(GamePhase::Initial, GamePhase::Initial, Some(&mut record), Step::RedBlack, choice)
//!     .unwrap();
//! assert!(outcome.card.is_some());
//! assert_eq!(record.player.remaining_cards(), 51);
//! ```

pub mod batcher;
pub mod deck;
mod error;
pub mod guess;
pub mod payout;
pub mod phase;
pub mod settlement;
pub mod step;
pub mod tiering;

pub use error::GameError;
pub use guess::CardCensus;
pub use phase::{GameRules, PhaseMachine, StepOutcome, Transition};
pub use settlement::{plan_settlement, SettlementConfig, SettlementPlan, TransferOperation};
pub use tiering::Standings;

mod game_flow_tests;
