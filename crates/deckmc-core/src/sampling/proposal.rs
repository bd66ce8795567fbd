//! Closed-form proposal distributions over the deck.

use super::source::{RandomSource, pick};
use crate::model::{Card, DECK_SIZE, Deck, Origin, Rank, Sample, Suit, TaggedCard};
use serde::{Deserialize, Serialize};

/// Probability of every card under the uniform target.
pub const TARGET_PMF: f64 = 1.0 / DECK_SIZE as f64;

/// Probability that the mixture sampler takes the face-biased branch.
pub const FACE_BRANCH_PROBABILITY: f64 = 0.5;

/// Rank pool of the face-biased sampler: each face rank appears three times.
const FACE_RANK_POOL: [Rank; 19] = [
    Rank::Ace,
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Jack,
    Rank::Jack,
    Rank::Queen,
    Rank::Queen,
    Rank::Queen,
    Rank::King,
    Rank::King,
    Rank::King,
];

/// Suit pool of the red-biased sampler: red suits appear twice.
const RED_SUIT_POOL: [Suit; 6] = [
    Suit::Hearts,
    Suit::Diamonds,
    Suit::Hearts,
    Suit::Diamonds,
    Suit::Spades,
    Suit::Clubs,
];

/// Which constants the biased proposals report from `pmf`.
///
/// `Demo` keeps the classroom values (3/52 for a face card, 2/52 for a red card, 1/52 otherwise).
/// They are proportional to the true sampling probabilities within each proposal but do not sum
/// to one. `Normalized` reports the exact per-card probabilities of the samplers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmfConvention {
    #[default]
    Demo,
    Normalized,
}

impl PmfConvention {
    /// Denominator applied to the face-biased slot weights (3 or 1).
    const fn face_normalizer(self) -> f64 {
        match self {
            PmfConvention::Demo => 52.0,
            PmfConvention::Normalized => 76.0,
        }
    }

    /// Denominator applied to the red-biased slot weights (2 or 1).
    const fn red_normalizer(self) -> f64 {
        match self {
            PmfConvention::Demo => 52.0,
            PmfConvention::Normalized => 78.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PmfConvention::Demo => "demo",
            PmfConvention::Normalized => "normalized",
        }
    }
}

/// Probability mass function over the deck.
pub trait Pmf {
    fn pmf(&self, card: Card) -> f64;
}

impl<P: Pmf + ?Sized> Pmf for &P {
    fn pmf(&self, card: Card) -> f64 {
        (**self).pmf(card)
    }
}

/// A sampler paired with the PMF it is consistent with.
pub trait Proposal: Pmf {
    type Output: Copy + Into<Sample>;

    fn name(&self) -> &'static str;

    fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Self::Output;

    /// Draws `count` samples in order.
    fn draw_many<R: RandomSource + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Self::Output> {
        (0..count).map(|_| self.draw(rng)).collect()
    }
}

/// Sum of `pmf` over all 52 cards.
pub fn total_mass<P: Pmf + ?Sized>(proposal: &P) -> f64 {
    Deck::standard().sum_by(|card| proposal.pmf(card))
}

/// Rank and suit independently uniform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uniform;

impl Pmf for Uniform {
    fn pmf(&self, _card: Card) -> f64 {
        TARGET_PMF
    }
}

impl Proposal for Uniform {
    type Output = Card;

    fn name(&self) -> &'static str {
        "uniform"
    }

    fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Card {
        let suit = pick(&Suit::ALL, rng);
        let rank = pick(&Rank::ORDERED, rng);
        Card::new(rank, suit)
    }
}

/// Oversamples J/Q/K three to one; suit stays uniform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceBiased {
    convention: PmfConvention,
}

impl FaceBiased {
    pub const fn new(convention: PmfConvention) -> Self {
        Self { convention }
    }
}

impl Pmf for FaceBiased {
    fn pmf(&self, card: Card) -> f64 {
        let slots = if card.is_face() { 3.0 } else { 1.0 };
        slots / self.convention.face_normalizer()
    }
}

impl Proposal for FaceBiased {
    type Output = Card;

    fn name(&self) -> &'static str {
        "face_biased"
    }

    fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Card {
        let suit = pick(&Suit::ALL, rng);
        let rank = pick(&FACE_RANK_POOL, rng);
        Card::new(rank, suit)
    }
}

/// Oversamples hearts and diamonds two to one; rank stays uniform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedBiased {
    convention: PmfConvention,
}

impl RedBiased {
    pub const fn new(convention: PmfConvention) -> Self {
        Self { convention }
    }
}

impl Pmf for RedBiased {
    fn pmf(&self, card: Card) -> f64 {
        let slots = if card.is_red() { 2.0 } else { 1.0 };
        slots / self.convention.red_normalizer()
    }
}

impl Proposal for RedBiased {
    type Output = Card;

    fn name(&self) -> &'static str {
        "red_biased"
    }

    fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Card {
        let rank = pick(&Rank::ORDERED, rng);
        let suit = pick(&RED_SUIT_POOL, rng);
        Card::new(rank, suit)
    }
}

/// Even mixture of [`FaceBiased`] and [`RedBiased`] that records which branch fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiProposal {
    face: FaceBiased,
    red: RedBiased,
}

impl MultiProposal {
    pub const fn new(convention: PmfConvention) -> Self {
        Self {
            face: FaceBiased::new(convention),
            red: RedBiased::new(convention),
        }
    }

    pub const fn face(&self) -> &FaceBiased {
        &self.face
    }

    pub const fn red(&self) -> &RedBiased {
        &self.red
    }

    /// PMF of the branch named by `origin`.
    pub fn origin_pmf(&self, origin: Origin, card: Card) -> f64 {
        match origin {
            Origin::Face => self.face.pmf(card),
            Origin::Red => self.red.pmf(card),
        }
    }
}

impl Pmf for MultiProposal {
    fn pmf(&self, card: Card) -> f64 {
        FACE_BRANCH_PROBABILITY * self.face.pmf(card)
            + (1.0 - FACE_BRANCH_PROBABILITY) * self.red.pmf(card)
    }
}

impl Proposal for MultiProposal {
    type Output = TaggedCard;

    fn name(&self) -> &'static str {
        "multi_proposal"
    }

    fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> TaggedCard {
        if rng.next_unit() < FACE_BRANCH_PROBABILITY {
            TaggedCard::new(self.face.draw(rng), Origin::Face)
        } else {
            TaggedCard::new(self.red.draw(rng), Origin::Red)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    const TOL: f64 = 1e-12;

    #[test]
    fn every_card_has_positive_mass_under_every_proposal() {
        for convention in [PmfConvention::Demo, PmfConvention::Normalized] {
            let mixture = MultiProposal::new(convention);
            for card in Deck::standard().iter() {
                assert!(Uniform.pmf(card) > 0.0);
                assert!(mixture.face().pmf(card) > 0.0);
                assert!(mixture.red().pmf(card) > 0.0);
                assert!(mixture.pmf(card) > 0.0);
            }
        }
    }

    #[test]
    fn normalized_proposals_sum_to_one() {
        let mixture = MultiProposal::new(PmfConvention::Normalized);
        assert!((total_mass(&Uniform) - 1.0).abs() < TOL);
        assert!((total_mass(mixture.face()) - 1.0).abs() < TOL);
        assert!((total_mass(mixture.red()) - 1.0).abs() < TOL);
        assert!((total_mass(&mixture) - 1.0).abs() < TOL);
    }

    #[test]
    fn demo_constants_carry_documented_excess_mass() {
        let mixture = MultiProposal::new(PmfConvention::Demo);
        assert!((total_mass(&Uniform) - 1.0).abs() < TOL);
        assert!((total_mass(mixture.face()) - 76.0 / 52.0).abs() < TOL);
        assert!((total_mass(mixture.red()) - 78.0 / 52.0).abs() < TOL);
    }

    #[test]
    fn demo_constants_match_classroom_values() {
        let face = FaceBiased::default();
        let red = RedBiased::default();
        let king = Card::new(Rank::King, Suit::Spades);
        let seven = Card::new(Rank::Seven, Suit::Hearts);
        assert!((face.pmf(king) - 3.0 / 52.0).abs() < TOL);
        assert!((face.pmf(seven) - 1.0 / 52.0).abs() < TOL);
        assert!((red.pmf(king) - 1.0 / 52.0).abs() < TOL);
        assert!((red.pmf(seven) - 2.0 / 52.0).abs() < TOL);
    }

    #[test]
    fn same_seed_yields_same_draws() {
        let mixture = MultiProposal::default();
        let mut rng_a = SmallRng::seed_from_u64(2024);
        let mut rng_b = SmallRng::seed_from_u64(2024);
        assert_eq!(
            mixture.draw_many(200, &mut rng_a),
            mixture.draw_many(200, &mut rng_b)
        );
        assert_eq!(
            Uniform.draw_many(200, &mut rng_a),
            Uniform.draw_many(200, &mut rng_b)
        );
    }

    fn empirical<P: Proposal<Output = Card>>(proposal: &P, draws: usize, seed: u64) -> Vec<f64> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut counts = vec![0usize; DECK_SIZE];
        for _ in 0..draws {
            counts[proposal.draw(&mut rng).id()] += 1;
        }
        counts
            .into_iter()
            .map(|count| count as f64 / draws as f64)
            .collect()
    }

    #[test]
    fn samplers_agree_with_normalized_pmf() {
        let draws = 200_000;
        let face = FaceBiased::new(PmfConvention::Normalized);
        let red = RedBiased::new(PmfConvention::Normalized);
        for (freqs, pmf) in [
            (empirical(&Uniform, draws, 11), &Uniform as &dyn Pmf),
            (empirical(&face, draws, 12), &face as &dyn Pmf),
            (empirical(&red, draws, 13), &red as &dyn Pmf),
        ] {
            for card in Deck::standard().iter() {
                let expected = pmf.pmf(card);
                let observed = freqs[card.id()];
                assert!(
                    (observed - expected).abs() < 0.25 * expected,
                    "{card}: observed {observed:.5} expected {expected:.5}"
                );
            }
        }
    }

    #[test]
    fn face_sampler_hits_faces_nine_times_in_nineteen() {
        let mut rng = SmallRng::seed_from_u64(77);
        let draws = 50_000;
        let faces = FaceBiased::default()
            .draw_many(draws, &mut rng)
            .into_iter()
            .filter(|card| card.is_face())
            .count();
        let rate = faces as f64 / draws as f64;
        assert!((rate - 9.0 / 19.0).abs() < 0.01, "face rate {rate}");
    }

    #[test]
    fn mixture_tags_match_branch_support() {
        let mixture = MultiProposal::default();
        let mut rng = SmallRng::seed_from_u64(8);
        let draws = mixture.draw_many(20_000, &mut rng);
        let face_branch = draws.iter().filter(|d| d.origin == Origin::Face).count();
        let share = face_branch as f64 / draws.len() as f64;
        assert!((share - 0.5).abs() < 0.02, "face branch share {share}");

        let red_branch: Vec<_> = draws.iter().filter(|d| d.origin == Origin::Red).collect();
        let red_rate =
            red_branch.iter().filter(|d| d.card.is_red()).count() as f64 / red_branch.len() as f64;
        assert!((red_rate - 2.0 / 3.0).abs() < 0.02, "red rate {red_rate}");
    }

    #[test]
    fn mixture_pmf_is_even_blend() {
        let mixture = MultiProposal::default();
        let jack_of_hearts = Card::new(Rank::Jack, Suit::Hearts);
        let expected = 0.5 * 3.0 / 52.0 + 0.5 * 2.0 / 52.0;
        assert!((mixture.pmf(jack_of_hearts) - expected).abs() < TOL);
        assert!((mixture.origin_pmf(Origin::Red, jack_of_hearts) - 2.0 / 52.0).abs() < TOL);
    }
}
