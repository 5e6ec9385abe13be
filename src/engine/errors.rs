use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    #[error("not this player's turn")]
    NotPlayersTurn,

    #[error("player cannot act in their current status")]
    ActorCannotAct,

    #[error("hand is not active")]
    HandNotActive,

    #[error("action is not legal in this state")]
    IllegalAction,

    #[error("cannot check while facing a bet")]
    CannotCheckFacingBet,

    #[error("cannot bet once the street is opened")]
    CannotBetWhenOpened,

    #[error("bet is below the big blind")]
    BetBelowMinimum,

    #[error("raise does not reach the minimum raise")]
    RaiseBelowMinimum,

    #[error("amount exceeds the player's stack")]
    InsufficientChips,

    #[error("unknown action codepoint")]
    UnknownAction,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid state transition")]
    InvalidTransition,

    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub trait InvariantCheck {
    fn validate_invariants(&self) -> Result<(), StateError>;
}
