//! Seeded shuffles and stack-discipline draws.
//!
//! A shuffle is ChaCha20 seeded from a `u64`, driving Fisher–Yates through
//! `SliceRandom::shuffle`. The same seed yields the same ordering on every
//! platform, so any player's deck can be replayed from its stored seed.

use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use ridethebus_types::game::{Card, Deck, Player};

use crate::GameError;

/// Deterministically permutes `deck` using `seed`.
pub fn shuffle_cards(mut deck: Deck, seed: u64) -> Deck {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    deck.as_mut_slice().shuffle(&mut rng);
    deck
}

/// The 52-card set shuffled with `seed`.
pub fn shuffle(seed: u64) -> Deck {
    shuffle_cards(Deck::standard(), seed)
}

/// Removes and returns the top (last) card.
pub fn draw(deck: &mut Deck) -> Result<Card, GameError> {
    deck.pop().ok_or(GameError::EmptyDeck)
}

/// The player's working deck, shuffling it from the player's seed on first use.
///
/// Returns a copy; callers write it back only once the step commits.
pub fn working_deck(player: &Player) -> Deck {
    match &player.working_deck {
        Some(deck) => deck.clone(),
        None => shuffle(player.deck_seed),
    }
}

/// Draws a fresh deck seed for a new player.
pub fn new_deck_seed<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64()
}
