use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::{Attempt, Deck, GamePhase, DECK_SIZE, STEPS_PER_ATTEMPT};

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PlayerInvariantError {
    #[error("record wallet mismatch (record={record}, field={field})")]
    WalletMismatch { record: String, field: String },
    #[error("attempt steps filled out of order (phase={0})")]
    StepsOutOfOrder(GamePhase),
    #[error("attempt stored under the wrong phase (expected={expected}, got={got})")]
    PhaseMismatch { expected: GamePhase, got: GamePhase },
    #[error("guess recorded before its card was drawn (card={0})")]
    GuessWithoutCard(usize),
}

/// Player state. Created at registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub wallet: String,
    pub points: u32,
    /// Confirmed stake in the token's smallest unit.
    pub staked: u64,
    /// Seed the working deck is shuffled from; kept so a deck can be replayed.
    pub deck_seed: u64,
    /// `None` until the first draw.
    pub working_deck: Option<Deck>,
}

impl Player {
    pub fn new(wallet: impl Into<String>, deck_seed: u64) -> Self {
        Self {
            wallet: wallet.into(),
            points: 0,
            staked: 0,
            deck_seed,
            working_deck: None,
        }
    }

    /// Cards left to draw. An unshuffled deck still holds the full set.
    pub fn remaining_cards(&self) -> usize {
        self.working_deck
            .as_ref()
            .map_or(DECK_SIZE, |deck| deck.len())
    }

    /// True if the working deck can fund another full attempt.
    pub fn can_fund_attempt(&self) -> bool {
        self.remaining_cards() >= STEPS_PER_ATTEMPT
    }
}

/// Payment the player still owes before any action is allowed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStake {
    pub wallet: String,
    pub pending_amount: u64,
}

impl PendingStake {
    pub fn new(wallet: impl Into<String>, pending_amount: u64) -> Self {
        Self {
            wallet: wallet.into(),
            pending_amount,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pending_amount == 0
    }
}

/// Phase-2 population guesses, one per phase-1 card.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    pub wallet: String,
    pub guesses: [Option<u32>; STEPS_PER_ATTEMPT],
}

impl Guess {
    pub fn new(wallet: impl Into<String>) -> Self {
        Self {
            wallet: wallet.into(),
            guesses: [None; STEPS_PER_ATTEMPT],
        }
    }
}

/// Payout classification derived from relative score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Top,
    Middle,
    Bottom,
}

impl Tier {
    pub fn pool_name(self) -> &'static str {
        match self {
            Tier::Top => "WINNING",
            Tier::Middle => "AVERAGE",
            Tier::Bottom => "LOSING",
        }
    }
}

/// Everything stored for one wallet. This is the unit of atomic mutation:
/// a step reads, validates, and writes the whole record or nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub player: Player,
    pub pending: PendingStake,
    /// Phase-1 attempt.
    pub initial: Option<Attempt>,
    /// Current phase-3 attempt, if one is armed or in progress.
    pub replay: Option<Attempt>,
    pub guess: Option<Guess>,
    /// Bumped on every committed mutation.
    pub version: u64,
}

impl WalletRecord {
    pub fn new(wallet: impl Into<String>, deck_seed: u64, pending_amount: u64) -> Self {
        let wallet = wallet.into();
        Self {
            player: Player::new(wallet.clone(), deck_seed),
            pending: PendingStake::new(wallet, pending_amount),
            initial: None,
            replay: None,
            guess: None,
            version: 0,
        }
    }

    pub fn wallet(&self) -> &str {
        &self.player.wallet
    }

    pub fn validate_invariants(&self) -> Result<(), PlayerInvariantError> {
        let wallet = self.wallet();
        let mut owners = vec![self.pending.wallet.as_str()];
        owners.extend(self.initial.iter().map(|a| a.wallet.as_str()));
        owners.extend(self.replay.iter().map(|a| a.wallet.as_str()));
        owners.extend(self.guess.iter().map(|g| g.wallet.as_str()));
        if let Some(other) = owners.into_iter().find(|owner| *owner != wallet) {
            return Err(PlayerInvariantError::WalletMismatch {
                record: wallet.to_string(),
                field: other.to_string(),
            });
        }

        for (attempt, expected) in [
            (&self.initial, GamePhase::Initial),
            (&self.replay, GamePhase::Replay),
        ] {
            let Some(attempt) = attempt else { continue };
            if attempt.phase != expected {
                return Err(PlayerInvariantError::PhaseMismatch {
                    expected,
                    got: attempt.phase,
                });
            }
            let filled = attempt.steps.iter().filter(|card| card.is_some()).count();
            if filled != attempt.filled() {
                return Err(PlayerInvariantError::StepsOutOfOrder(attempt.phase));
            }
        }

        if let Some(guess) = &self.guess {
            for (slot, value) in guess.guesses.iter().enumerate() {
                let drawn = self
                    .initial
                    .as_ref()
                    .is_some_and(|attempt| attempt.steps[slot].is_some());
                if value.is_some() && !drawn {
                    return Err(PlayerInvariantError::GuessWithoutCard(slot + 1));
                }
            }
        }
        Ok(())
    }
}
