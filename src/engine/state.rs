use super::errors::*;
use super::types::*;

/// Betting state for one hand. Seats carry only dealt-in players; seat ids
/// are table seat indices and stay stable across streets.
#[derive(Clone, Debug)]
pub struct BettingState {
    pub street: Street,
    pub status: HandStatus,
    pub dealer: SeatId,
    pub sb_seat: SeatId,
    pub bb_seat: SeatId,
    pub to_act: SeatId,

    /// Highest street bet to match this street.
    pub current_bet: Chips,
    /// Size of the last full raise, floored at the big blind.
    pub min_raise: Chips,
    /// Codepoint of the last applied action (Null after a street advance).
    pub last_action: Action,
    pub last_bet_size: Chips,

    pub pot: Chips,
    pub stakes: Stakes,
    pub seats: Vec<SeatState>,

    /// Preflop only: the big blind may still raise an unraised pot.
    pub bb_option_open: bool,
}

impl BettingState {
    /// Posts blinds and sets the preflop acting order. Heads-up the dealer
    /// is the small blind and acts first; otherwise the blinds sit left of
    /// the dealer and action starts left of the big blind.
    pub fn new_hand(
        stakes: Stakes,
        dealer: SeatId,
        entries: Vec<(SeatId, Chips)>,
    ) -> Result<Self, StateError> {
        if entries.len() < 2 {
            return Err(StateError::InvariantViolation("need at least two players"));
        }
        let seats: Vec<SeatState> = entries
            .iter()
            .map(|&(seat, stack)| SeatState::new(seat, stack))
            .collect();
        if !seats.iter().any(|s| s.seat == dealer) {
            return Err(StateError::InvariantViolation("dealer seat not dealt in"));
        }

        let order: Vec<SeatId> = seats.iter().map(|s| s.seat).collect();
        let after = |seat: SeatId| -> SeatId {
            let pos = order.iter().position(|&s| s == seat).unwrap();
            order[(pos + 1) % order.len()]
        };

        let heads_up = seats.len() == 2;
        let sb_seat = if heads_up { dealer } else { after(dealer) };
        let bb_seat = after(sb_seat);
        let first = if heads_up { dealer } else { after(bb_seat) };

        let mut state = Self {
            street: Street::Preflop,
            status: HandStatus::Active,
            dealer,
            sb_seat,
            bb_seat,
            to_act: first,
            current_bet: 0,
            min_raise: stakes.big_blind,
            last_action: Action::Null,
            last_bet_size: stakes.big_blind,
            pot: 0,
            stakes,
            seats,
            bb_option_open: true,
        };
        state.post_blind(sb_seat, stakes.small_blind);
        state.post_blind(bb_seat, stakes.big_blind);
        state.current_bet = state
            .seats
            .iter()
            .map(|s| s.street_bet)
            .max()
            .unwrap_or(0);
        Ok(state)
    }

    fn post_blind(&mut self, seat: SeatId, blind: Chips) {
        let entry = self.seat_mut(seat);
        let posted = blind.min(entry.stack);
        entry.stack -= posted;
        entry.street_bet += posted;
        entry.total_bet += posted;
        if entry.stack == 0 {
            entry.status = PlayerStatus::AllIn;
        }
        self.pot += posted;
    }

    pub fn seat(&self, seat: SeatId) -> &SeatState {
        self.seats
            .iter()
            .find(|s| s.seat == seat)
            .expect("seat dealt in")
    }

    pub fn seat_mut(&mut self, seat: SeatId) -> &mut SeatState {
        self.seats
            .iter_mut()
            .find(|s| s.seat == seat)
            .expect("seat dealt in")
    }

    pub fn has_seat(&self, seat: SeatId) -> bool {
        self.seats.iter().any(|s| s.seat == seat)
    }

    pub fn amount_to_call(&self, seat: SeatId) -> Chips {
        let entry = self.seat(seat);
        self.current_bet.saturating_sub(entry.street_bet)
    }

    pub fn non_folded_seats(&self) -> Vec<SeatId> {
        self.seats
            .iter()
            .filter(|s| !matches!(s.status, PlayerStatus::Folded | PlayerStatus::SittingOut))
            .map(|s| s.seat)
            .collect()
    }

    pub fn active_seats(&self) -> Vec<SeatId> {
        self.seats
            .iter()
            .filter(|s| s.status == PlayerStatus::Active)
            .map(|s| s.seat)
            .collect()
    }

    /// Next seat clockwise that can still act.
    pub fn next_active_after(&self, from: SeatId) -> Option<SeatId> {
        let order: Vec<SeatId> = self.seats.iter().map(|s| s.seat).collect();
        let start = order.iter().position(|&s| s == from)?;
        (1..=order.len())
            .map(|offset| order[(start + offset) % order.len()])
            .find(|&seat| self.seat(seat).status == PlayerStatus::Active)
    }

    /// First active seat clockwise from the dealer; the post-flop opener.
    pub fn first_active_after_dealer(&self) -> Option<SeatId> {
        self.next_active_after(self.dealer)
    }

    /// The betting round is closed once every player who can still act has
    /// acted and matched the current bet.
    pub fn street_settled(&self) -> bool {
        self.seats
            .iter()
            .filter(|s| s.status == PlayerStatus::Active)
            .all(|s| s.acted_this_street && s.street_bet == self.current_bet)
    }

    /// True when no further betting is possible and remaining streets are
    /// simply dealt out.
    pub fn betting_locked(&self) -> bool {
        self.active_seats().len() <= 1 && self.non_folded_seats().len() > 1
    }

    pub fn reset_for_next_street(&mut self, street: Street) {
        self.street = street;
        self.current_bet = 0;
        self.min_raise = self.stakes.big_blind;
        self.last_action = Action::Null;
        self.last_bet_size = self.stakes.big_blind;
        self.bb_option_open = false;
        for entry in self.seats.iter_mut() {
            entry.street_bet = 0;
            entry.acted_this_street = false;
        }
    }
}

impl InvariantCheck for BettingState {
    fn validate_invariants(&self) -> Result<(), StateError> {
        let committed: Chips = self.seats.iter().map(|s| s.total_bet).sum();
        if committed != self.pot {
            return Err(StateError::InvariantViolation("pot != sum of total bets"));
        }
        for entry in &self.seats {
            if entry.street_bet > entry.total_bet {
                return Err(StateError::InvariantViolation("street bet exceeds total"));
            }
        }
        Ok(())
    }
}
