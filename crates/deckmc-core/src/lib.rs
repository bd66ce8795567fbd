pub mod estimator;
pub mod model;
pub mod poker;
pub mod sampling;
pub mod weighting;

pub use estimator::recompute_stats;
pub use weighting::weight;

use model::Card;
use sampling::{Pmf, Proposal, RandomSource};

/// Draws one card (tagged for the mixture) from `proposal`.
pub fn draw_card<P, R>(proposal: &P, rng: &mut R) -> P::Output
where
    P: Proposal + ?Sized,
    R: RandomSource + ?Sized,
{
    proposal.draw(rng)
}

pub fn pmf<P: Pmf + ?Sized>(proposal: &P, card: Card) -> f64 {
    proposal.pmf(card)
}

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "deckmc"
    }

    pub const fn codename() -> &'static str {
        "Deck Monte Carlo"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Origin, Rank, Suit};
    use crate::sampling::{FaceBiased, MultiProposal, Uniform};
    use crate::weighting::ImportanceWeight;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "deckmc");
        assert_eq!(AppInfo::codename(), "Deck Monte Carlo");
        assert!(!AppInfo::version().is_empty());
    }

    #[test]
    fn boundary_functions_forward_to_proposals_and_strategies() {
        let king = Card::new(Rank::King, Suit::Spades);
        assert!((pmf(&Uniform, king) - 1.0 / 52.0).abs() < 1e-12);
        assert!((pmf(&FaceBiased::default(), king) - 3.0 / 52.0).abs() < 1e-12);

        let importance = ImportanceWeight::new(FaceBiased::default());
        let w = weight(&importance, king, None).unwrap();
        assert!((w - 1.0 / 3.0).abs() < 1e-12);

        let mut rng = SmallRng::seed_from_u64(3);
        let tagged = draw_card(&MultiProposal::default(), &mut rng);
        assert!(matches!(tagged.origin, Origin::Face | Origin::Red));
    }
}
