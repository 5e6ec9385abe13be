//! No-limit betting engine: legal-action oracle, action transitions,
//! street advancement, and showdown side pots.

mod engine;
mod errors;
mod legals;
mod settle;
mod state;
mod types;


pub use engine::{advance_street, apply_action, AppliedAction, Transition};
pub use errors::{ActionError, InvariantCheck, StateError};
pub use legals::{valid_actions, ValidActions};
pub use settle::{compute_side_pots, distribute_pots, SidePot};
pub use state::BettingState;
pub use types::{
    Action, Chips, HandStatus, PlayerStatus, SeatId, SeatState, Stakes, Street,
};
