//! Phase 2: players estimate how many others drew a card of the same value.

use std::collections::HashMap;

use ridethebus_types::game::{Card, GamePhase, Guess, Step, WalletRecord, STEPS_PER_ATTEMPT};
use tracing::debug;

use crate::phase::{ensure_settled, PhaseMachine};
use crate::GameError;

/// Phase-1 card values per wallet, used to answer population counts.
#[derive(Clone, Debug, Default)]
pub struct CardCensus {
    values: HashMap<String, [Option<u8>; STEPS_PER_ATTEMPT]>,
}

impl CardCensus {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a WalletRecord>,
    {
        let mut census = Self::default();
        for record in records {
            census.observe(record);
        }
        census
    }

    /// Refreshes one wallet's entry after a commit.
    pub fn observe(&mut self, record: &WalletRecord) {
        let Some(attempt) = &record.initial else {
            return;
        };
        let values = attempt.steps.map(|card| card.map(|c| c.value()));
        self.values.insert(record.player.wallet.clone(), values);
    }

    /// Number of wallets whose phase-1 card at `step` has `value`.
    pub fn count(&self, step: Step, value: u8) -> u32 {
        let count = self
            .values
            .values()
            .filter(|values| values[step.slot()] == Some(value))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// Points for a guess, by relative error against `actual`.
pub fn score_guess(guess: u32, actual: u32) -> u32 {
    if actual == 0 {
        return if guess == 0 { 5 } else { 0 };
    }
    // |g - a| / a <= p / 100, kept in integers.
    let error = u64::from(guess.abs_diff(actual)) * 100;
    let actual = u64::from(actual);
    if error <= actual {
        5
    } else if error <= actual * 5 {
        3
    } else if error <= actual * 10 {
        1
    } else {
        0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuessOutcome {
    pub step: Step,
    pub card: Card,
    pub guess: u32,
    pub actual: u32,
    pub delta_points: u32,
    pub message: String,
}

/// Records a guess for phase-1 card `step` and scores it.
pub fn submit_guess(
    active: GamePhase,
    record: Option<&mut WalletRecord>,
    step: Step,
    guess: u32,
    census: &CardCensus,
) -> Result<GuessOutcome, GameError> {
    PhaseMachine::require_phase(active, GamePhase::Guessing)?;
    let record = record.ok_or(GameError::NotRegistered)?;
    ensure_settled(&record.pending)?;
    let card = initial_card(record, step)?;

    let mut guesses = record
        .guess
        .clone()
        .unwrap_or_else(|| Guess::new(record.player.wallet.clone()));
    if let Some(previous) = guesses.guesses[step.slot()] {
        return Err(GameError::AlreadyPlayed(format!(
            "You already guessed {previous} for card {}",
            step.number()
        )));
    }

    let actual = census.count(step, card.value());
    let delta_points = score_guess(guess, actual);
    guesses.guesses[step.slot()] = Some(guess);
    record.guess = Some(guesses);
    record.player.points = record.player.points.saturating_add(delta_points);

    debug!(
        wallet = record.player.wallet.as_str(),
        card = step.number(),
        guess,
        actual,
        delta_points,
        "guess scored"
    );
    Ok(GuessOutcome {
        step,
        card,
        guess,
        actual,
        delta_points,
        message: format!(
            "You guessed {guess} and {actual} players drew a {}. You get {delta_points} points.",
            card.display()
        ),
    })
}

/// The caller's phase-1 card `step`.
pub fn review_card(
    active: GamePhase,
    record: Option<&WalletRecord>,
    step: Step,
) -> Result<Card, GameError> {
    PhaseMachine::require_phase(active, GamePhase::Guessing)?;
    let record = record.ok_or(GameError::NotRegistered)?;
    initial_card(record, step)
}

pub fn review_points(active: GamePhase, record: Option<&WalletRecord>) -> Result<u32, GameError> {
    PhaseMachine::require_phase(active, GamePhase::Guessing)?;
    let record = record.ok_or(GameError::NotRegistered)?;
    Ok(record.player.points)
}

fn initial_card(record: &WalletRecord, step: Step) -> Result<Card, GameError> {
    record
        .initial
        .as_ref()
        .and_then(|attempt| attempt.card(step))
        .ok_or_else(|| {
            GameError::OutOfOrder(format!(
                "You never drew card {} in phase 1",
                step.number()
            ))
        })
}
