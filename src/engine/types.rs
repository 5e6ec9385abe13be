pub type Chips = u64;
pub type SeatId = u8; // 0..=9

/// Action codepoints as they appear on the wire and in state commitments.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Null = 0,
    Bet = 1,
    Call = 2,
    Fold = 3,
    Raise = 4,
    Check = 5,
    AllIn = 6,
}

impl Action {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Action::Null),
            1 => Some(Action::Bet),
            2 => Some(Action::Call),
            3 => Some(Action::Fold),
            4 => Some(Action::Raise),
            5 => Some(Action::Check),
            6 => Some(Action::AllIn),
            _ => None,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Street {
    Preflop = 0,
    Flop = 1,
    Turn = 2,
    River = 3,
    Showdown = 4,
}

impl Street {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Street> {
        match self {
            Street::Preflop => Some(Street::Flop),
            Street::Flop => Some(Street::Turn),
            Street::Turn => Some(Street::River),
            Street::River => Some(Street::Showdown),
            Street::Showdown => None,
        }
    }

    /// Board cards revealed when this street begins.
    pub fn cards_revealed(self) -> usize {
        match self {
            Street::Flop => 3,
            Street::Turn | Street::River => 1,
            Street::Preflop | Street::Showdown => 0,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandStatus {
    Waiting = 0,
    Active = 1,
    Finished = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Can act this street.
    Active,
    /// Out of the hand; chips already committed stay in the pot.
    Folded,
    /// Cannot act; still eligible for pots up to their contribution.
    AllIn,
    /// Not dealt in.
    SittingOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatState {
    pub seat: SeatId,
    pub stack: Chips,
    pub street_bet: Chips,
    pub total_bet: Chips,
    pub status: PlayerStatus,
    pub acted_this_street: bool,
}

impl SeatState {
    pub fn new(seat: SeatId, stack: Chips) -> Self {
        Self {
            seat,
            stack,
            street_bet: 0,
            total_bet: 0,
            status: PlayerStatus::Active,
            acted_this_street: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stakes {
    pub small_blind: Chips,
    pub big_blind: Chips,
}
