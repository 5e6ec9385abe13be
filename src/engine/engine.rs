use super::errors::*;
use super::state::BettingState;
use super::types::*;

/// What a successfully applied action did to the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedAction {
    pub seat: SeatId,
    pub action: Action,
    /// Chips moved into the pot by this action.
    pub chips_in: Chips,
    pub new_pot: Chips,
    pub remaining_stack: Chips,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Continued { next_to_act: SeatId },
    StreetEnd,
    HandEndByFold { winner: SeatId },
}

/// Applies one player action. `amount` is the total street bet for Bet and
/// Raise and is ignored for the other actions.
pub fn apply_action(
    state: &mut BettingState,
    seat: SeatId,
    action: Action,
    amount: Chips,
) -> Result<(Transition, AppliedAction), ActionError> {
    if state.status != HandStatus::Active {
        return Err(ActionError::HandNotActive);
    }
    if !state.has_seat(seat) {
        return Err(ActionError::ActorCannotAct);
    }
    if state.to_act != seat {
        return Err(ActionError::NotPlayersTurn);
    }
    if state.seat(seat).status != PlayerStatus::Active {
        return Err(ActionError::ActorCannotAct);
    }

    let price = state.amount_to_call(seat);
    let chips_in = match action {
        Action::Null => return Err(ActionError::UnknownAction),
        Action::Fold => {
            let entry = state.seat_mut(seat);
            entry.status = PlayerStatus::Folded;
            entry.acted_this_street = true;
            0
        }
        Action::Check => {
            if price > 0 {
                return Err(ActionError::CannotCheckFacingBet);
            }
            let bb_checking = seat == state.bb_seat && state.street == Street::Preflop;
            if bb_checking {
                state.bb_option_open = false;
            }
            state.seat_mut(seat).acted_this_street = true;
            0
        }
        Action::Call => {
            if price == 0 {
                return Err(ActionError::IllegalAction);
            }
            let entry = state.seat_mut(seat);
            let pay = price.min(entry.stack);
            entry.stack -= pay;
            entry.street_bet += pay;
            entry.total_bet += pay;
            entry.acted_this_street = true;
            if entry.stack == 0 {
                entry.status = PlayerStatus::AllIn;
            }
            state.pot += pay;
            pay
        }
        Action::Bet => {
            if state.current_bet != 0 {
                return Err(ActionError::CannotBetWhenOpened);
            }
            if amount < state.stakes.big_blind {
                return Err(ActionError::BetBelowMinimum);
            }
            let entry = state.seat_mut(seat);
            if amount > entry.stack {
                return Err(ActionError::InsufficientChips);
            }
            entry.stack -= amount;
            entry.street_bet = amount;
            entry.total_bet += amount;
            entry.acted_this_street = true;
            if entry.stack == 0 {
                entry.status = PlayerStatus::AllIn;
            }
            state.pot += amount;
            state.current_bet = amount;
            state.min_raise = amount;
            state.last_bet_size = amount;
            reopen_action(state, seat);
            amount
        }
        Action::Raise => {
            if state.current_bet == 0 {
                return Err(ActionError::IllegalAction);
            }
            let min_to = state.current_bet + state.min_raise;
            if amount < min_to {
                return Err(ActionError::RaiseBelowMinimum);
            }
            let raise_size = amount - state.current_bet;
            let entry = state.seat_mut(seat);
            let needed = amount.saturating_sub(entry.street_bet);
            if needed > entry.stack {
                return Err(ActionError::InsufficientChips);
            }
            entry.stack -= needed;
            entry.street_bet = amount;
            entry.total_bet += needed;
            entry.acted_this_street = true;
            if entry.stack == 0 {
                entry.status = PlayerStatus::AllIn;
            }
            state.pot += needed;
            state.current_bet = amount;
            state.min_raise = raise_size;
            state.last_bet_size = raise_size;
            if seat == state.bb_seat {
                state.bb_option_open = false;
            }
            reopen_action(state, seat);
            needed
        }
        Action::AllIn => {
            let entry = state.seat(seat);
            if entry.stack == 0 {
                return Err(ActionError::IllegalAction);
            }
            let total = entry.street_bet + entry.stack;
            let pay = entry.stack;
            let was_unopened = state.current_bet == 0;
            let raise_size = total.saturating_sub(state.current_bet);

            let entry = state.seat_mut(seat);
            entry.stack = 0;
            entry.street_bet = total;
            entry.total_bet += pay;
            entry.status = PlayerStatus::AllIn;
            entry.acted_this_street = true;
            state.pot += pay;

            if was_unopened {
                state.current_bet = total;
                state.min_raise = total.max(state.stakes.big_blind);
                state.last_bet_size = total;
                reopen_action(state, seat);
            } else if total > state.current_bet {
                state.current_bet = total;
                // A short all-in raises the price without reopening action.
                if raise_size >= state.min_raise {
                    state.min_raise = raise_size;
                    state.last_bet_size = raise_size;
                    reopen_action(state, seat);
                }
            }
            if seat == state.bb_seat {
                state.bb_option_open = false;
            }
            pay
        }
    };

    state.last_action = action;
    let entry = state.seat(seat);
    let applied = AppliedAction {
        seat,
        action,
        chips_in,
        new_pot: state.pot,
        remaining_stack: entry.stack,
    };

    let non_folded = state.non_folded_seats();
    if non_folded.len() == 1 {
        state.status = HandStatus::Finished;
        return Ok((
            Transition::HandEndByFold {
                winner: non_folded[0],
            },
            applied,
        ));
    }

    if state.street_settled() {
        return Ok((Transition::StreetEnd, applied));
    }

    let next = state
        .next_active_after(seat)
        .ok_or(ActionError::IllegalAction)?;
    state.to_act = next;
    Ok((Transition::Continued { next_to_act: next }, applied))
}

/// An aggressive action puts every other active player back on the clock.
fn reopen_action(state: &mut BettingState, aggressor: SeatId) {
    for entry in state.seats.iter_mut() {
        if entry.seat != aggressor && entry.status == PlayerStatus::Active {
            entry.acted_this_street = false;
        }
    }
}

/// Closes the current street and opens the next. Returns the new street;
/// `Street::Showdown` means betting is over.
pub fn advance_street(state: &mut BettingState) -> Result<Street, StateError> {
    let next = state.street.next().ok_or(StateError::InvalidTransition)?;
    state.reset_for_next_street(next);
    if next != Street::Showdown {
        if let Some(first) = state.first_active_after_dealer() {
            state.to_act = first;
        }
    }
    Ok(next)
}

/// Closure property: the oracle and the transition function agree.
#[cfg(test)]
pub fn oracle_matches_apply(state: &BettingState, seat: SeatId) -> bool {
    let legals = super::legals::valid_actions(state, seat);
    for codepoint in 1..=6u8 {
        let action = Action::from_u8(codepoint).unwrap();
        let amount = match action {
            Action::Bet => legals.min_bet,
            Action::Raise => legals.min_raise_to,
            _ => 0,
        };
        let mut probe = state.clone();
        let applies = apply_action(&mut probe, seat, action, amount).is_ok();
        if applies != legals.allows(action) {
            return false;
        }
    }
    true
}
