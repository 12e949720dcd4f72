//! Per-player phase state machine.
//!
//! Every attempt moves through `Unstarted → Step1Done → Step2Done → Step3Done →
//! Step4Done`, one drawn card per step. Two phases run attempts:
//!
//! - **Initial** (phase 1): one attempt per player. A wrong guess scores 0 but
//!   still spends the step, so the attempt always reaches `Step4Done`.
//! - **Replay** (phase 3): bottom players buy attempts with
//!   [`PhaseMachine::start_replay`]. Only a correct fourth step scores (+1). Any
//!   wrong step deletes the attempt; the player may buy another one while the
//!   working deck still holds a full attempt's worth of cards.
//!
//! ## Guards
//!
//! Checked in order before anything is drawn:
//! 1. the requested phase is the active phase (`InvalidPhase`)
//! 2. the wallet is registered (`NotRegistered`)
//! 3. no stake is pending (`UnconfirmedStake`)
//! 4. the previous step is filled (`OutOfOrder`) and this one is empty (`AlreadyPlayed`)
//!
//! ## Atomicity
//!
//! Methods validate and draw on copies and only write to the record once the
//! step has fully resolved. On `Err` the record is untouched.

use ridethebus_types::game::{
    Attempt, AttemptState, Card, GamePhase, PendingStake, Step, Tier, WalletRecord,
    ATTEMPT_COST, REGISTRATION_COST, STEPS_PER_ATTEMPT,
};
use tracing::debug;

use crate::step::{self, Choice};
use crate::{deck, GameError, Standings};

/// Stake amounts charged by the game, in the token's smallest unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameRules {
    pub registration_cost: u64,
    pub attempt_cost: u64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            registration_cost: REGISTRATION_COST,
            attempt_cost: ATTEMPT_COST,
        }
    }
}

/// How an attempt moved as a result of one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing was drawn or written.
    Reviewed,
    /// The step was spent and the attempt advanced.
    Advanced(AttemptState),
    /// Replay attempt lost; another may be bought.
    Failed { remaining: usize },
    /// Replay attempt lost and the deck cannot fund another.
    Exhausted { remaining: usize },
}

/// Result of one step submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: Step,
    /// Card drawn by this step; `None` for reviews.
    pub card: Option<Card>,
    /// Cards drawn earlier in the attempt.
    pub previous: Vec<Card>,
    pub correct: Option<bool>,
    pub delta_points: u32,
    pub transition: Transition,
    pub message: String,
}

/// Phase-1 review: every drawn card plus the current score.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialReview {
    pub cards: Vec<Card>,
    pub points: u32,
    pub message: String,
}

/// Phase-3 review: the caller's current pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierReview {
    pub tier: Tier,
    pub points: u32,
    pub top_count: usize,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct PhaseMachine {
    rules: GameRules,
}

impl PhaseMachine {
    pub fn new(rules: GameRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn require_phase(active: GamePhase, expected: GamePhase) -> Result<(), GameError> {
        if active != expected {
            return Err(GameError::InvalidPhase { expected, active });
        }
        Ok(())
    }

    /// Creates the record for a new wallet with the registration stake pending.
    pub fn register(
        &self,
        active: GamePhase,
        existing: Option<&WalletRecord>,
        wallet: &str,
        deck_seed: u64,
    ) -> Result<WalletRecord, GameError> {
        Self::require_phase(active, GamePhase::Initial)?;
        if existing.is_some() {
            return Err(GameError::AlreadyRegistered);
        }
        debug!(wallet, "registering player");
        Ok(WalletRecord::new(
            wallet,
            deck_seed,
            self.rules.registration_cost,
        ))
    }

    /// Plays (or reviews) one step of the caller's attempt in `phase`.
    pub fn play_step(
        &self,
        active: GamePhase,
        phase: GamePhase,
        record: Option<&mut WalletRecord>,
        step: Step,
        choice: Choice,
    ) -> Result<StepOutcome, GameError> {
        if !matches!(phase, GamePhase::Initial | GamePhase::Replay) {
            return Err(GameError::InvalidPhase {
                expected: GamePhase::Initial,
                active: phase,
            });
        }
        Self::require_phase(active, phase)?;
        let record = record.ok_or(GameError::NotRegistered)?;
        ensure_settled(&record.pending)?;

        let mut attempt = current_attempt(record, phase, step)?;
        if let Some(previous) = step.previous() {
            if !attempt.is_filled(previous) {
                return Err(GameError::OutOfOrder(format!(
                    "Please play {} before you play {}",
                    previous.name(),
                    step.name()
                )));
            }
        }
        if let Some(card) = attempt.card(step) {
            return Err(GameError::AlreadyPlayed(format!(
                "You've already played this. Your card was {card}"
            )));
        }

        if choice.is_review() {
            if !matches!(step, Step::HighLow | Step::InsideOutside) {
                return Err(GameError::InvalidChoice {
                    step: step.name(),
                    choice: choice.label(),
                });
            }
            let previous = attempt.drawn();
            return Ok(StepOutcome {
                step,
                card: None,
                message: format!("Your cards are: {}", join_cards(&previous)),
                previous,
                correct: None,
                delta_points: 0,
                transition: Transition::Reviewed,
            });
        }

        let mut working = deck::working_deck(&record.player);
        let card = deck::draw(&mut working)?;
        let correct = step::evaluate(step, choice, &attempt, card)?;
        let previous = attempt.drawn();
        attempt.steps[step.slot()] = Some(card);
        let remaining = working.len();

        // Resolved; commit.
        record.player.working_deck = Some(working);
        let (delta_points, transition) = match phase {
            GamePhase::Initial => {
                let delta = u32::from(correct);
                let state = attempt.state();
                record.initial = Some(attempt);
                (delta, Transition::Advanced(state))
            }
            _ if correct => {
                let delta = u32::from(step == Step::Suit);
                let state = attempt.state();
                record.replay = Some(attempt);
                (delta, Transition::Advanced(state))
            }
            _ => {
                record.replay = None;
                if remaining >= STEPS_PER_ATTEMPT {
                    (0, Transition::Failed { remaining })
                } else {
                    (0, Transition::Exhausted { remaining })
                }
            }
        };
        record.player.points = record.player.points.saturating_add(delta_points);

        debug!(
            wallet = record.player.wallet.as_str(),
            %phase,
            step = step.number(),
            %card,
            correct,
            delta_points,
            remaining,
            "step resolved"
        );

        Ok(StepOutcome {
            step,
            card: Some(card),
            message: step_message(phase, step, choice, card, correct, delta_points, transition),
            previous,
            correct: Some(correct),
            delta_points,
            transition,
        })
    }

    /// Arms a fresh replay attempt and adds its cost to the pending stake.
    ///
    /// Only Bottom-tier players are eligible, so a fully tied population has
    /// nobody to replay. Returns the amount the player now has to pay.
    pub fn start_replay(
        &self,
        active: GamePhase,
        record: Option<&mut WalletRecord>,
        standings: Option<&Standings>,
    ) -> Result<u64, GameError> {
        Self::require_phase(active, GamePhase::Replay)?;
        let record = record.ok_or(GameError::NotRegistered)?;
        ensure_settled(&record.pending)?;

        let bottom = standings.is_some_and(|s| s.tier_of(record.player.points) == Tier::Bottom);
        if !bottom {
            return Err(GameError::NotBottomTier);
        }
        if record
            .replay
            .as_ref()
            .is_some_and(|attempt| !attempt.is_complete())
        {
            return Err(GameError::AlreadyPlayed(
                "You already have an attempt in progress".to_string(),
            ));
        }
        if !record.player.can_fund_attempt() {
            return Err(GameError::ExhaustedTerminal {
                remaining: record.player.remaining_cards(),
            });
        }

        let cost = self.rules.attempt_cost;
        record.replay = Some(Attempt::new(record.player.wallet.clone(), GamePhase::Replay));
        record.pending.pending_amount = record.pending.pending_amount.saturating_add(cost);
        debug!(
            wallet = record.player.wallet.as_str(),
            cost,
            remaining = record.player.remaining_cards(),
            "replay attempt armed"
        );
        Ok(cost)
    }

    /// Lists the caller's phase-1 cards and score.
    pub fn review_initial(
        &self,
        active: GamePhase,
        record: Option<&WalletRecord>,
    ) -> Result<InitialReview, GameError> {
        Self::require_phase(active, GamePhase::Initial)?;
        let record = record.ok_or(GameError::NotRegistered)?;
        ensure_settled(&record.pending)?;
        let attempt = record.initial.as_ref().ok_or_else(|| {
            GameError::OutOfOrder(
                "Please play Red/Black before you can review your cards".to_string(),
            )
        })?;
        let cards = attempt.drawn();
        let points = record.player.points;
        Ok(InitialReview {
            message: format!(
                "Your cards are: {}. You currently have {points} points.",
                join_cards(&cards)
            ),
            cards,
            points,
        })
    }

    /// Reports which pool the caller currently sits in.
    pub fn review_tier(
        &self,
        active: GamePhase,
        record: Option<&WalletRecord>,
        standings: Option<&Standings>,
    ) -> Result<TierReview, GameError> {
        Self::require_phase(active, GamePhase::Replay)?;
        let record = record.ok_or(GameError::NotRegistered)?;
        let standings = standings.ok_or(GameError::NotRegistered)?;
        let points = record.player.points;
        let tier = standings.tier_of(points);
        let message = match tier {
            Tier::Top => format!(
                "You are currently in the WINNING pool, there's {} total winning players.",
                standings.top_count
            ),
            Tier::Middle => "You are in the AVERAGE pool.".to_string(),
            Tier::Bottom => "You are currently in the LOSING pool.".to_string(),
        };
        Ok(TierReview {
            tier,
            points,
            top_count: standings.top_count,
            message,
        })
    }
}

pub(crate) fn ensure_settled(pending: &PendingStake) -> Result<(), GameError> {
    if !pending.is_settled() {
        return Err(GameError::UnconfirmedStake {
            pending: pending.pending_amount,
        });
    }
    Ok(())
}

/// The attempt a step applies to, before ordering guards.
fn current_attempt(
    record: &WalletRecord,
    phase: GamePhase,
    step: Step,
) -> Result<Attempt, GameError> {
    let wallet = record.player.wallet.clone();
    match phase {
        GamePhase::Initial => match (&record.initial, step) {
            (Some(_), Step::RedBlack) => Err(GameError::AlreadyPlayed(
                "You're already past this step".to_string(),
            )),
            (Some(attempt), _) => Ok(attempt.clone()),
            (None, Step::RedBlack) => Ok(Attempt::new(wallet, GamePhase::Initial)),
            (None, _) => Err(GameError::OutOfOrder(format!(
                "Please play Red/Black before you play {}",
                step.name()
            ))),
        },
        _ => record.replay.clone().ok_or_else(|| {
            GameError::OutOfOrder(format!(
                "Please start an attempt before you play {}",
                step.name()
            ))
        }),
    }
}

pub(crate) fn join_cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(Card::display)
        .collect::<Vec<_>>()
        .join(", ")
}

fn step_message(
    phase: GamePhase,
    step: Step,
    choice: Choice,
    card: Card,
    correct: bool,
    delta_points: u32,
    transition: Transition,
) -> String {
    let head = format!("Your card was {card} and you chose {}.", choice.label());
    let tail = match transition {
        Transition::Failed { .. } => "You can restart the attempt.".to_string(),
        Transition::Exhausted { .. } => {
            "You have less than four cards left. No more attempts can be made.".to_string()
        }
        Transition::Reviewed => String::new(),
        Transition::Advanced(_) => match (phase, step) {
            (GamePhase::Replay, Step::Suit) => {
                "Congrats, you're no longer a loser!".to_string()
            }
            (GamePhase::Initial, Step::Suit) => "Check in later for phase 2.".to_string(),
            (_, step) => format!("Move to Card {}.", step.number() + 1),
        },
    };
    let score = match (correct, delta_points) {
        (_, 0) => String::new(),
        (_, 1) => " You get 1 point.".to_string(),
        (_, n) => format!(" You get {n} points."),
    };
    format!("{head}{score} {tail}").trim_end().to_string()
}
