//! Five-card straight demo built on three mixed hand-pair proposals.
//!
//! Only straights are detected. When both hands hold one, the winner is a coin flip: comparing
//! straight ranks is out of scope.

use crate::model::{Card, Rank, Suit};
use crate::sampling::RandomSource;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HAND_SIZE: usize = 5;

/// Chance that the straight-biased generator builds a straight outright.
const FORCED_STRAIGHT_PROBABILITY: f64 = 0.3;
/// Chance of the straight-heavy pair proposal.
const STRAIGHT_HEAVY_PROBABILITY: f64 = 0.4;
/// Chance of the mixed pair proposal once straight-heavy was declined.
const MIXED_GIVEN_NOT_HEAVY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PokerHand {
    cards: [Card; HAND_SIZE],
}

impl PokerHand {
    pub const fn new(cards: [Card; HAND_SIZE]) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card; HAND_SIZE] {
        &self.cards
    }

    /// Five consecutive ranks, ace high only. Pairs never qualify.
    pub fn has_straight(&self) -> bool {
        let mut values = self.cards.map(|card| card.rank.high_value());
        values.sort_unstable();
        values.windows(2).all(|pair| pair[1] == pair[0] + 1)
    }
}

impl fmt::Display for PokerHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, card) in self.cards.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{card}")?;
        }
        Ok(())
    }
}

fn random_card<R: RandomSource + ?Sized>(rng: &mut R) -> Card {
    let suit = Suit::ALL[rng.next_index(Suit::ALL.len())];
    let rank = Rank::HIGH_ORDER[rng.next_index(Rank::HIGH_ORDER.len())];
    Card::new(rank, suit)
}

/// Five distinct cards, uniform over the deck, by rejecting repeats.
pub fn uniform_hand<R: RandomSource + ?Sized>(rng: &mut R) -> PokerHand {
    let mut cards = [random_card(rng); HAND_SIZE];
    let mut filled = 1;
    while filled < HAND_SIZE {
        let card = random_card(rng);
        if !cards[..filled].contains(&card) {
            cards[filled] = card;
            filled += 1;
        }
    }
    PokerHand::new(cards)
}

/// A forced straight starting at 2 through 10 with probability 0.3, otherwise a uniform hand.
///
/// Suits of a forced straight are drawn independently per card.
pub fn straight_biased_hand<R: RandomSource + ?Sized>(rng: &mut R) -> PokerHand {
    if rng.next_unit() >= FORCED_STRAIGHT_PROBABILITY {
        return uniform_hand(rng);
    }

    let start = rng.next_index(Rank::HIGH_ORDER.len() - HAND_SIZE + 1);
    let mut cards = [Card::new(Rank::Two, Suit::Spades); HAND_SIZE];
    for (offset, slot) in cards.iter_mut().enumerate() {
        let suit = Suit::ALL[rng.next_index(Suit::ALL.len())];
        *slot = Card::new(Rank::HIGH_ORDER[start + offset], suit);
    }
    PokerHand::new(cards)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairProposal {
    /// Both hands straight-biased.
    StraightHeavy,
    /// Player A straight-biased, player B uniform.
    Mixed,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokerDeal {
    pub player_a: PokerHand,
    pub player_b: PokerHand,
    pub straight_a: bool,
    pub straight_b: bool,
    pub winner: Option<Player>,
    pub proposal: PairProposal,
}

impl PokerDeal {
    pub const fn both_straights(&self) -> bool {
        self.straight_a && self.straight_b
    }
}

/// Draws one pair of hands from the 40/42/18 proposal mixture.
pub fn deal_pair<R: RandomSource + ?Sized>(rng: &mut R) -> PokerDeal {
    let proposal = if rng.next_unit() < STRAIGHT_HEAVY_PROBABILITY {
        PairProposal::StraightHeavy
    } else if rng.next_unit() < MIXED_GIVEN_NOT_HEAVY {
        PairProposal::Mixed
    } else {
        PairProposal::Uniform
    };

    let (player_a, player_b) = match proposal {
        PairProposal::StraightHeavy => {
            let a = straight_biased_hand(rng);
            (a, straight_biased_hand(rng))
        }
        PairProposal::Mixed => {
            let a = straight_biased_hand(rng);
            (a, uniform_hand(rng))
        }
        PairProposal::Uniform => {
            let a = uniform_hand(rng);
            (a, uniform_hand(rng))
        }
    };

    let straight_a = player_a.has_straight();
    let straight_b = player_b.has_straight();
    let winner = if straight_a && straight_b {
        Some(if rng.next_unit() < 0.5 {
            Player::A
        } else {
            Player::B
        })
    } else {
        None
    };

    PokerDeal {
        player_a,
        player_b,
        straight_a,
        straight_b,
        winner,
        proposal,
    }
}

/// Counters derived from a full list of deals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokerTally {
    pub sample_count: usize,
    pub straight_a: usize,
    pub straight_b: usize,
    pub both_straights: usize,
    pub player_a_wins: usize,
    pub by_proposal: BTreeMap<PairProposal, usize>,
}

impl PokerTally {
    pub fn recompute(deals: &[PokerDeal]) -> Self {
        let mut tally = Self {
            sample_count: deals.len(),
            ..Self::default()
        };
        for deal in deals {
            tally.straight_a += usize::from(deal.straight_a);
            tally.straight_b += usize::from(deal.straight_b);
            if deal.both_straights() {
                tally.both_straights += 1;
                if deal.winner == Some(Player::A) {
                    tally.player_a_wins += 1;
                }
            }
            *tally.by_proposal.entry(deal.proposal).or_default() += 1;
        }
        tally
    }

    /// Share of both-straight deals that player A won; 0 when there are none.
    pub fn win_rate(&self) -> f64 {
        if self.both_straights == 0 {
            0.0
        } else {
            self.player_a_wins as f64 / self.both_straights as f64
        }
    }
}

/// The last `k` deals in which both players held a straight, oldest first.
pub fn recent_both_straights(deals: &[PokerDeal], k: usize) -> Vec<PokerDeal> {
    let mut recent: Vec<PokerDeal> = deals
        .iter()
        .rev()
        .filter(|deal| deal.both_straights())
        .take(k)
        .copied()
        .collect();
    recent.reverse();
    recent
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashSet;

    fn hand(spec: [(Rank, Suit); HAND_SIZE]) -> PokerHand {
        PokerHand::new(spec.map(|(rank, suit)| Card::new(rank, suit)))
    }

    #[test]
    fn detects_consecutive_ranks_ace_high() {
        let broadway = hand([
            (Rank::Ten, Suit::Spades),
            (Rank::Jack, Suit::Hearts),
            (Rank::Queen, Suit::Clubs),
            (Rank::King, Suit::Spades),
            (Rank::Ace, Suit::Diamonds),
        ]);
        assert!(broadway.has_straight());

        let wheel = hand([
            (Rank::Ace, Suit::Spades),
            (Rank::Two, Suit::Hearts),
            (Rank::Three, Suit::Clubs),
            (Rank::Four, Suit::Spades),
            (Rank::Five, Suit::Diamonds),
        ]);
        assert!(!wheel.has_straight());

        let paired = hand([
            (Rank::Four, Suit::Spades),
            (Rank::Four, Suit::Hearts),
            (Rank::Five, Suit::Clubs),
            (Rank::Six, Suit::Spades),
            (Rank::Seven, Suit::Diamonds),
        ]);
        assert!(!paired.has_straight());
    }

    #[test]
    fn uniform_hands_hold_distinct_cards() {
        let mut rng = SmallRng::seed_from_u64(31);
        for _ in 0..500 {
            let dealt = uniform_hand(&mut rng);
            let unique: HashSet<_> = dealt.cards().iter().collect();
            assert_eq!(unique.len(), HAND_SIZE);
        }
    }

    #[test]
    fn biased_hands_are_straights_about_thirty_percent_of_the_time() {
        let mut rng = SmallRng::seed_from_u64(32);
        let draws = 20_000;
        let straights = (0..draws)
            .filter(|_| straight_biased_hand(&mut rng).has_straight())
            .count();
        let rate = straights as f64 / draws as f64;
        assert!((0.28..0.33).contains(&rate), "straight rate {rate}");
    }

    #[test]
    fn proposal_mixture_follows_forty_forty_two_eighteen() {
        let mut rng = SmallRng::seed_from_u64(33);
        let deals: Vec<PokerDeal> = (0..20_000).map(|_| deal_pair(&mut rng)).collect();
        let tally = PokerTally::recompute(&deals);
        let share = |p: PairProposal| tally.by_proposal[&p] as f64 / tally.sample_count as f64;
        assert!((share(PairProposal::StraightHeavy) - 0.40).abs() < 0.02);
        assert!((share(PairProposal::Mixed) - 0.42).abs() < 0.02);
        assert!((share(PairProposal::Uniform) - 0.18).abs() < 0.02);
        assert!(tally.both_straights > 0);
        assert!(tally.player_a_wins <= tally.both_straights);
        assert!((tally.win_rate() - 0.5).abs() < 0.1);
    }

    #[test]
    fn winner_only_set_when_both_hold_straights() {
        let mut rng = SmallRng::seed_from_u64(34);
        for _ in 0..2_000 {
            let deal = deal_pair(&mut rng);
            assert_eq!(deal.winner.is_some(), deal.both_straights());
        }
    }

    #[test]
    fn recent_both_straights_keeps_latest_in_order() {
        let mut rng = SmallRng::seed_from_u64(35);
        let deals: Vec<PokerDeal> = (0..3_000).map(|_| deal_pair(&mut rng)).collect();
        let recent = recent_both_straights(&deals, 5);
        assert!(recent.len() <= 5);
        let all: Vec<PokerDeal> = deals.iter().filter(|d| d.both_straights()).copied().collect();
        assert_eq!(recent.as_slice(), &all[all.len().saturating_sub(5)..]);
    }

    #[test]
    fn empty_tally_has_zero_win_rate() {
        let tally = PokerTally::recompute(&[]);
        assert_eq!(tally.sample_count, 0);
        assert_eq!(tally.win_rate(), 0.0);
    }

    #[test]
    fn hands_render_space_separated() {
        let dealt = hand([
            (Rank::Two, Suit::Spades),
            (Rank::Three, Suit::Hearts),
            (Rank::Four, Suit::Clubs),
            (Rank::Five, Suit::Spades),
            (Rank::Six, Suit::Diamonds),
        ]);
        assert_eq!(dealt.to_string(), "2♠️ 3♥️ 4♣️ 5♠️ 6♦️");
    }
}
