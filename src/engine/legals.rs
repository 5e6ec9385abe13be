use super::state::BettingState;
use super::types::*;

/// The action set and price information offered to the current actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidActions {
    pub actions: Vec<Action>,
    pub amount_to_call: Chips,
    pub min_bet: Chips,
    /// Minimum total street bet for a legal raise.
    pub min_raise_to: Chips,
}

impl ValidActions {
    pub fn none() -> Self {
        Self {
            actions: Vec::new(),
            amount_to_call: 0,
            min_bet: 0,
            min_raise_to: 0,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Legal-action oracle. Exactly the actions [`super::apply_action`] would
/// accept for the current actor; empty for anyone else.
pub fn valid_actions(state: &BettingState, seat: SeatId) -> ValidActions {
    if state.status != HandStatus::Active || !state.has_seat(seat) || state.to_act != seat {
        return ValidActions::none();
    }
    let entry = state.seat(seat);
    if entry.status != PlayerStatus::Active {
        return ValidActions::none();
    }

    let price = state.amount_to_call(seat);
    let mut actions = vec![Action::Fold];

    if price == 0 {
        actions.push(Action::Check);
    } else {
        actions.push(Action::Call);
    }

    let unopened = state.current_bet == 0;
    if unopened && entry.stack >= state.stakes.big_blind {
        actions.push(Action::Bet);
    }

    let bb_option = state.street == Street::Preflop
        && seat == state.bb_seat
        && state.bb_option_open
        && price == 0;
    let reachable = entry.street_bet + entry.stack;
    let can_full_raise =
        !unopened && reachable >= state.current_bet + state.min_raise && price < entry.stack;
    if can_full_raise || (bb_option && reachable >= state.current_bet + state.min_raise) {
        actions.push(Action::Raise);
    }

    if entry.stack > 0 {
        actions.push(Action::AllIn);
    }

    ValidActions {
        actions,
        amount_to_call: price.min(entry.stack),
        min_bet: state.stakes.big_blind,
        min_raise_to: state.current_bet + state.min_raise,
    }
}
