use crate::model::deck::DECK_SIZE;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub const fn value(self) -> u8 {
        self.rank.value()
    }

    pub const fn is_face(self) -> bool {
        self.rank.is_face()
    }

    pub const fn is_red(self) -> bool {
        self.suit.is_red()
    }

    /// Dense index in `0..52`, suit-major.
    pub const fn id(self) -> usize {
        self.suit.index() * 13 + self.rank.index()
    }

    pub const fn from_id(id: usize) -> Option<Self> {
        if id < DECK_SIZE {
            Some(Self::from_id_wrapping(id))
        } else {
            None
        }
    }

    /// Card for `id % 52`.
    pub(crate) const fn from_id_wrapping(id: usize) -> Self {
        let id = id % DECK_SIZE;
        Self {
            rank: Rank::ORDERED[id % 13],
            suit: Suit::ALL[id / 13],
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// Which component of the mixture sampler produced a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Face,
    Red,
}

impl Origin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Origin::Face => "face",
            Origin::Red => "red",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card drawn by the mixture sampler along with the branch that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedCard {
    pub card: Card,
    pub origin: Origin,
}

impl TaggedCard {
    pub const fn new(card: Card, origin: Origin) -> Self {
        Self { card, origin }
    }
}

impl fmt::Display for TaggedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.card.fmt(f)
    }
}

/// Element of a sample log: a card plus its provenance when the sampler recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    pub card: Card,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl Sample {
    pub const fn untagged(card: Card) -> Self {
        Self { card, origin: None }
    }

    pub const fn tagged(card: Card, origin: Origin) -> Self {
        Self {
            card,
            origin: Some(origin),
        }
    }
}

impl From<Card> for Sample {
    fn from(card: Card) -> Self {
        Sample::untagged(card)
    }
}

impl From<TaggedCard> for Sample {
    fn from(tagged: TaggedCard) -> Self {
        Sample::tagged(tagged.card, tagged.origin)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.card.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, Origin, Rank, Sample, Suit, TaggedCard};

    #[test]
    fn formats_rank_then_suit() {
        assert_eq!(Card::new(Rank::King, Suit::Spades).to_string(), "K♠️");
        assert_eq!(Card::new(Rank::Ten, Suit::Diamonds).to_string(), "10♦️");
    }

    #[test]
    fn predicates_forward_to_rank_and_suit() {
        let card = Card::new(Rank::Queen, Suit::Hearts);
        assert!(card.is_face());
        assert!(card.is_red());
        assert_eq!(card.value(), 12);

        let card = Card::new(Rank::Seven, Suit::Clubs);
        assert!(!card.is_face());
        assert!(!card.is_red());
    }

    #[test]
    fn ids_are_dense_and_invertible() {
        for id in 0..52 {
            let card = Card::from_id(id).expect("valid id");
            assert_eq!(card.id(), id);
        }
        assert_eq!(Card::from_id(52), None);
    }

    #[test]
    fn tag_is_not_part_of_card_identity() {
        let card = Card::new(Rank::Jack, Suit::Diamonds);
        let face = Sample::from(TaggedCard::new(card, Origin::Face));
        let red = Sample::from(TaggedCard::new(card, Origin::Red));
        assert_ne!(face, red);
        assert_eq!(face.card, red.card);
        assert_eq!(Sample::from(card).origin, None);
    }

    #[test]
    fn samples_serialize_without_empty_origin() {
        let plain = Sample::from(Card::new(Rank::Two, Suit::Clubs));
        let json = serde_json::to_string(&plain).expect("serialize");
        assert_eq!(json, r#"{"card":{"rank":"Two","suit":"Clubs"}}"#);

        let tagged = Sample::tagged(Card::new(Rank::Two, Suit::Clubs), Origin::Red);
        let json = serde_json::to_string(&tagged).expect("serialize");
        let back: Sample = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, tagged);
    }
}
