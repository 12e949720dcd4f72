use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::{Card, STEPS_PER_ATTEMPT};

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum AttemptError {
    #[error("unknown phase: {0}")]
    UnknownPhase(u8),
    #[error("unknown step: {0}")]
    UnknownStep(u8),
}

/// Which phase's actions are currently open.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// No phase is open.
    #[default]
    Closed = 0,
    /// Registration and the first ride through the four cards.
    Initial = 1,
    /// Population guesses about phase-1 cards.
    Guessing = 2,
    /// Bottom-tier players buy replay attempts.
    Replay = 3,
}

impl GamePhase {
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for GamePhase {
    type Error = AttemptError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GamePhase::Closed),
            1 => Ok(GamePhase::Initial),
            2 => Ok(GamePhase::Guessing),
            3 => Ok(GamePhase::Replay),
            other => Err(AttemptError::UnknownPhase(other)),
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase {}", self.number())
    }
}

/// The four guessing steps of an attempt, in play order.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    RedBlack = 1,
    HighLow = 2,
    InsideOutside = 3,
    Suit = 4,
}

impl Step {
    pub const ALL: [Step; STEPS_PER_ATTEMPT] =
        [Step::RedBlack, Step::HighLow, Step::InsideOutside, Step::Suit];

    /// 1-based step number.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// 0-based slot in `Attempt::steps`.
    pub fn slot(self) -> usize {
        self as usize - 1
    }

    pub fn previous(self) -> Option<Step> {
        match self {
            Step::RedBlack => None,
            Step::HighLow => Some(Step::RedBlack),
            Step::InsideOutside => Some(Step::HighLow),
            Step::Suit => Some(Step::InsideOutside),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::RedBlack => "Red/Black",
            Step::HighLow => "High/Low",
            Step::InsideOutside => "Inside/Outside",
            Step::Suit => "Suit",
        }
    }
}

impl TryFrom<u8> for Step {
    type Error = AttemptError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Step::RedBlack),
            2 => Ok(Step::HighLow),
            3 => Ok(Step::InsideOutside),
            4 => Ok(Step::Suit),
            other => Err(AttemptError::UnknownStep(other)),
        }
    }
}

/// Progress of an attempt, derived from how many steps are filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptState {
    Unstarted,
    Step1Done,
    Step2Done,
    Step3Done,
    Step4Done,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Step4Done)
    }
}

/// One pass through the four steps for a phase (or one replay re-entry).
///
/// Steps fill strictly left to right; a filled step is never cleared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub wallet: String,
    pub phase: GamePhase,
    pub steps: [Option<Card>; STEPS_PER_ATTEMPT],
}

impl Attempt {
    pub fn new(wallet: impl Into<String>, phase: GamePhase) -> Self {
        Self {
            wallet: wallet.into(),
            phase,
            steps: [None; STEPS_PER_ATTEMPT],
        }
    }

    pub fn card(&self, step: Step) -> Option<Card> {
        self.steps[step.slot()]
    }

    pub fn is_filled(&self, step: Step) -> bool {
        self.steps[step.slot()].is_some()
    }

    /// Number of steps filled, relying on the left-to-right invariant.
    pub fn filled(&self) -> usize {
        self.steps.iter().take_while(|card| card.is_some()).count()
    }

    pub fn state(&self) -> AttemptState {
        match self.filled() {
            0 => AttemptState::Unstarted,
            1 => AttemptState::Step1Done,
            2 => AttemptState::Step2Done,
            3 => AttemptState::Step3Done,
            _ => AttemptState::Step4Done,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_terminal()
    }

    /// Cards drawn so far, in step order.
    pub fn drawn(&self) -> Vec<Card> {
        self.steps.iter().map_while(|card| *card).collect()
    }
}
