pub mod card;
pub mod deck;
pub mod rank;
pub mod suit;

pub use card::{Card, Origin, Sample, TaggedCard};
pub use deck::{DECK_SIZE, Deck};
pub use rank::Rank;
pub use suit::Suit;
