use ridethebus_types::game::GamePhase;
use ridethebus_types::ErrorKind;
use thiserror::Error;

/// Errors raised by the game core. Every variant is recoverable at the
/// request boundary; none of them leaves a wallet record partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game not on {expected} (currently {active})")]
    InvalidPhase {
        expected: GamePhase,
        active: GamePhase,
    },
    #[error("you have to register first")]
    NotRegistered,
    #[error("you're already registered")]
    AlreadyRegistered,
    #[error("you have {pending} units of unconfirmed stake left to pay")]
    UnconfirmedStake { pending: u64 },
    #[error("{0}")]
    OutOfOrder(String),
    #[error("{0}")]
    AlreadyPlayed(String),
    #[error("deck is empty")]
    EmptyDeck,
    #[error("your deck has {remaining} cards left, no more attempts can be made")]
    ExhaustedTerminal { remaining: usize },
    #[error("invalid choice for {step}: {choice}")]
    InvalidChoice { step: &'static str, choice: String },
    #[error("you're not in the LOSING pool")]
    NotBottomTier,
    /// A collaborator (storage) could not take the change; nothing was applied.
    #[error("{0}, try again later")]
    Transient(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidPhase { .. } => ErrorKind::InvalidPhase,
            GameError::NotRegistered => ErrorKind::NotRegistered,
            GameError::AlreadyRegistered => ErrorKind::AlreadyRegistered,
            GameError::UnconfirmedStake { .. } => ErrorKind::UnconfirmedStake,
            GameError::OutOfOrder(_) => ErrorKind::OutOfOrder,
            GameError::AlreadyPlayed(_) => ErrorKind::AlreadyPlayed,
            GameError::EmptyDeck => ErrorKind::EmptyDeck,
            GameError::ExhaustedTerminal { .. } => ErrorKind::ExhaustedTerminal,
            GameError::InvalidChoice { .. } => ErrorKind::InvalidChoice,
            GameError::NotBottomTier => ErrorKind::NotBottomTier,
            GameError::Transient(_) => ErrorKind::Transient,
        }
    }
}
