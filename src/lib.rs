//! zk-holdem: a proof-verifying mental-poker coordinator and client core.
//!
//! Peers jointly shuffle, deal, selectively reveal, and settle Texas
//! Hold'em hands over ElGamal-masked cards on BabyJubJub. The coordinator
//! never learns a card it is not entitled to see; every player-driven state
//! transition is gated on a Groth16 proof checked against the coordinator's
//! own commitments.

pub mod cards;
pub mod crypto;
pub mod engine;
pub mod game;
pub mod proofs;
pub mod protocol;
pub mod prover;
pub mod ranking;
pub mod server;
