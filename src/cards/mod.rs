//! Collaboratively masked cards and the deck commitment.

pub mod deck;
pub mod masked;

pub use deck::{commit_deck, initial_deck, DECK_SIZE};
pub use masked::{card_index_of_point, card_value_point, CardOpError, MaskedCard};
