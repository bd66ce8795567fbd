use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;

pub const DECK_SIZE: usize = 52;

/// The full sample space: every rank in every suit, suit-major.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL.iter().copied() {
            for rank in Rank::ORDERED.iter().copied() {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = Card> + '_ {
        self.cards.iter().copied()
    }

    /// Sums `f` over every card of the deck.
    pub fn sum_by<F: FnMut(Card) -> f64>(&self, f: F) -> f64 {
        self.iter().map(f).sum()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::standard()
    }
}
