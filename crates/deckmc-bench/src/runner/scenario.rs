use std::collections::BTreeMap;

use deckmc_core::estimator::{FACE_CARD_PERCENTAGE, NAIVE_AVERAGE};
use deckmc_core::model::{Deck, Origin, Sample};
use deckmc_core::sampling::{
    FaceBiased, MultiProposal, Pmf, PmfConvention, Proposal, RandomSource, RedBiased, Uniform,
};
use deckmc_core::weighting::{ImportanceWeight, MisStrategies, WeightError, WeightingStrategy};

use crate::config::{ScenarioConfig, ScenarioKind};

/// Which proposal feeds the sample log.
#[derive(Debug, Clone, Copy)]
pub enum Sampler {
    Uniform(Uniform),
    FaceBiased(FaceBiased),
    Mixture(MultiProposal),
}

impl Sampler {
    pub fn name(&self) -> &'static str {
        match self {
            Sampler::Uniform(p) => p.name(),
            Sampler::FaceBiased(p) => p.name(),
            Sampler::Mixture(p) => p.name(),
        }
    }

    pub fn draw_batch<R: RandomSource + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Sample> {
        match self {
            Sampler::Uniform(p) => collect(p, count, rng),
            Sampler::FaceBiased(p) => collect(p, count, rng),
            Sampler::Mixture(p) => collect(p, count, rng),
        }
    }

    /// Every sample the sampler can emit with its exact probability.
    fn support(&self) -> Vec<(Sample, f64)> {
        let deck = Deck::standard();
        match self {
            Sampler::Uniform(p) => deck.iter().map(|c| (Sample::from(c), p.pmf(c))).collect(),
            Sampler::FaceBiased(_) => {
                let exact = FaceBiased::new(PmfConvention::Normalized);
                deck.iter().map(|c| (Sample::from(c), exact.pmf(c))).collect()
            }
            Sampler::Mixture(_) => {
                let face = FaceBiased::new(PmfConvention::Normalized);
                let red = RedBiased::new(PmfConvention::Normalized);
                let mut support = Vec::with_capacity(2 * deck.cards().len());
                for card in deck.iter() {
                    support.push((Sample::tagged(card, Origin::Face), 0.5 * face.pmf(card)));
                    support.push((Sample::tagged(card, Origin::Red), 0.5 * red.pmf(card)));
                }
                support
            }
        }
    }
}

fn collect<P, R>(proposal: &P, count: usize, rng: &mut R) -> Vec<Sample>
where
    P: Proposal,
    R: RandomSource + ?Sized,
{
    proposal
        .draw_many(count, rng)
        .into_iter()
        .map(Into::into)
        .collect()
}

/// Sampler plus the weighting strategies reported for one card scenario.
pub struct EstimationPlan {
    pub sampler: Sampler,
    strategies: Vec<Box<dyn WeightingStrategy>>,
}

impl EstimationPlan {
    /// `None` for scenarios that do not sample single cards.
    pub fn for_scenario(scenario: &ScenarioConfig) -> Option<Self> {
        let convention = scenario.pmf_convention;
        let plan = match scenario.kind {
            ScenarioKind::Uniform => Self {
                sampler: Sampler::Uniform(Uniform),
                strategies: Vec::new(),
            },
            ScenarioKind::FaceBiased => Self {
                sampler: Sampler::FaceBiased(FaceBiased::new(convention)),
                strategies: Vec::new(),
            },
            ScenarioKind::WeightedConvergence | ScenarioKind::WeightedWalkthrough => {
                let proposal = FaceBiased::new(convention);
                Self {
                    sampler: Sampler::FaceBiased(proposal),
                    strategies: vec![Box::new(ImportanceWeight::new(proposal))],
                }
            }
            ScenarioKind::MisConvergence | ScenarioKind::MisWalkthrough => {
                let mis = MisStrategies::new(convention, scenario.mixing);
                Self {
                    sampler: Sampler::Mixture(MultiProposal::new(convention)),
                    strategies: vec![Box::new(mis.memory), Box::new(mis.balance)],
                }
            }
            ScenarioKind::PokerStraight => return None,
        };
        Some(plan)
    }

    pub fn strategies(&self) -> Vec<&dyn WeightingStrategy> {
        self.strategies.iter().map(|s| s.as_ref()).collect()
    }

    /// Large-sample limit of every reported statistic under the sampler's true distribution.
    pub fn expected_values(&self) -> Result<BTreeMap<String, f64>, WeightError> {
        let support = self.sampler.support();
        let mut expected = BTreeMap::new();

        let naive: f64 = support
            .iter()
            .map(|(s, q)| q * f64::from(s.card.value()))
            .sum();
        let faces: f64 = support
            .iter()
            .filter(|(s, _)| s.card.is_face())
            .map(|(_, q)| q)
            .sum();
        expected.insert(NAIVE_AVERAGE.to_string(), naive);
        expected.insert(FACE_CARD_PERCENTAGE.to_string(), faces * 100.0);

        for strategy in &self.strategies {
            let mut weighted = 0.0;
            let mut total = 0.0;
            for (sample, q) in &support {
                let w = strategy.weight(sample)?;
                weighted += q * w * f64::from(sample.card.value());
                total += q * w;
            }
            let limit = if total > 0.0 { weighted / total } else { 0.0 };
            expected.insert(strategy.label().to_string(), limit);
        }
        Ok(expected)
    }
}
