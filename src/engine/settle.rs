//! Showdown-time side-pot computation and distribution.

use std::collections::HashMap;

use super::types::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidePot {
    pub amount: Chips,
    /// Non-folded seats that can win this pot, seat order.
    pub eligible: Vec<SeatId>,
}

/// Tiered side pots from per-seat total contributions.
///
/// Distinct nonzero `total_bet` levels ascending; each level's slice is
/// `(curr - prev) * |seats with total_bet >= curr|` counting folded chips,
/// while eligibility is restricted to non-folded seats at that level. A
/// slice everybody at its level abandoned falls back to all non-folded
/// seats so chips are never stranded.
pub fn compute_side_pots(seats: &[SeatState]) -> Vec<SidePot> {
    let mut levels: Vec<Chips> = seats
        .iter()
        .map(|s| s.total_bet)
        .filter(|&c| c > 0)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let non_folded: Vec<SeatId> = seats
        .iter()
        .filter(|s| !matches!(s.status, PlayerStatus::Folded | PlayerStatus::SittingOut))
        .map(|s| s.seat)
        .collect();

    let mut pots = Vec::new();
    let mut prev: Chips = 0;
    for curr in levels {
        let contributors = seats.iter().filter(|s| s.total_bet >= curr).count() as Chips;
        let amount = (curr - prev) * contributors;
        let mut eligible: Vec<SeatId> = seats
            .iter()
            .filter(|s| {
                s.total_bet >= curr
                    && !matches!(s.status, PlayerStatus::Folded | PlayerStatus::SittingOut)
            })
            .map(|s| s.seat)
            .collect();
        if eligible.is_empty() {
            eligible = non_folded.clone();
        }
        pots.push(SidePot { amount, eligible });
        prev = curr;
    }
    pots
}

/// Awards every pot to its best eligible hand. `ranks` maps revealed seats
/// to their global hand rank (lower is better); eligible seats without a
/// rank cannot win. Odd chips go to the first winner clockwise from the
/// dealer.
pub fn distribute_pots(
    pots: &[SidePot],
    ranks: &HashMap<SeatId, u16>,
    dealer: SeatId,
    table_size: u8,
) -> HashMap<SeatId, Chips> {
    let clockwise_key = |seat: SeatId| -> u8 {
        (seat + table_size - (dealer + 1) % table_size) % table_size
    };

    let mut payouts: HashMap<SeatId, Chips> = HashMap::new();
    for pot in pots {
        let best = pot
            .eligible
            .iter()
            .filter_map(|seat| ranks.get(seat).map(|&rank| rank))
            .min();
        let Some(best) = best else { continue };

        let mut winners: Vec<SeatId> = pot
            .eligible
            .iter()
            .copied()
            .filter(|seat| ranks.get(seat) == Some(&best))
            .collect();
        winners.sort_by_key(|&seat| clockwise_key(seat));

        let share = pot.amount / winners.len() as Chips;
        let remainder = pot.amount % winners.len() as Chips;
        for (i, seat) in winners.iter().enumerate() {
            let mut won = share;
            if i == 0 {
                won += remainder;
            }
            *payouts.entry(*seat).or_insert(0) += won;
        }
    }
    payouts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: SeatId, total: Chips, status: PlayerStatus) -> SeatState {
        SeatState {
            seat: id,
            stack: 0,
            street_bet: 0,
            total_bet: total,
            status,
            acted_this_street: false,
        }
    }

    #[test]
    fn three_way_all_in_builds_main_and_side() {
        // P1 all-in 20, P2 and P3 at 50: main 60 for everyone, side 60 for
        // the two big stacks.
        let seats = vec![
            seat(0, 20, PlayerStatus::AllIn),
            seat(1, 50, PlayerStatus::Active),
            seat(2, 50, PlayerStatus::Active),
        ];
        let pots = compute_side_pots(&seats);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 60);
        assert_eq!(pots[0].eligible, vec![0, 1, 2]);
        assert_eq!(pots[1].amount, 60);
        assert_eq!(pots[1].eligible, vec![1, 2]);
    }

    #[test]
    fn folded_chips_stay_in_the_pot_but_not_in_eligibility() {
        // P2 folds after committing 20; the slice up to 20 still counts
        // their chips.
        let seats = vec![
            seat(0, 20, PlayerStatus::AllIn),
            seat(1, 20, PlayerStatus::Folded),
            seat(2, 50, PlayerStatus::Active),
        ];
        let pots = compute_side_pots(&seats);
        assert_eq!(pots[0].amount, 60);
        assert_eq!(pots[0].eligible, vec![0, 2]);
        assert_eq!(pots[1].amount, 30);
        assert_eq!(pots[1].eligible, vec![2]);
    }

    #[test]
    fn solvency_over_every_layout() {
        let layouts: Vec<Vec<SeatState>> = vec![
            vec![
                seat(0, 5, PlayerStatus::AllIn),
                seat(1, 25, PlayerStatus::Active),
                seat(2, 13, PlayerStatus::Folded),
                seat(3, 25, PlayerStatus::Active),
            ],
            vec![
                seat(0, 100, PlayerStatus::Active),
                seat(1, 100, PlayerStatus::Active),
            ],
            vec![
                seat(0, 7, PlayerStatus::Folded),
                seat(1, 60, PlayerStatus::AllIn),
                seat(2, 90, PlayerStatus::Active),
            ],
        ];
        for seats in layouts {
            let total: Chips = seats.iter().map(|s| s.total_bet).sum();
            let pots = compute_side_pots(&seats);
            let pot_sum: Chips = pots.iter().map(|p| p.amount).sum();
            assert_eq!(pot_sum, total, "side pots must sum to the pot");
            for pot in &pots {
                for seat_id in &pot.eligible {
                    let entry = seats.iter().find(|s| s.seat == *seat_id).unwrap();
                    assert!(!matches!(entry.status, PlayerStatus::Folded));
                }
            }
        }
    }

    #[test]
    fn tie_splits_evenly_with_odd_chip_clockwise_from_dealer() {
        let seats = vec![
            seat(0, 25, PlayerStatus::Active),
            seat(1, 25, PlayerStatus::Active),
            seat(2, 25, PlayerStatus::Active),
        ];
        let pots = compute_side_pots(&seats);
        let mut ranks = HashMap::new();
        ranks.insert(0u8, 100u16);
        ranks.insert(1u8, 100u16);
        ranks.insert(2u8, 500u16);
        // Dealer 0: first winner clockwise is seat 1.
        let payouts = distribute_pots(&pots, &ranks, 0, 3);
        assert_eq!(payouts[&1], 38);
        assert_eq!(payouts[&0], 37);
        assert!(!payouts.contains_key(&2));
    }

    #[test]
    fn unrevealed_hands_cannot_win() {
        let seats = vec![
            seat(0, 10, PlayerStatus::Active),
            seat(1, 10, PlayerStatus::Active),
        ];
        let pots = compute_side_pots(&seats);
        let mut ranks = HashMap::new();
        ranks.insert(1u8, 3000u16);
        let payouts = distribute_pots(&pots, &ranks, 0, 2);
        assert_eq!(payouts[&1], 20);
        assert!(!payouts.contains_key(&0));
    }
}
