use super::mixing::MixingWeights;
use crate::model::{Card, Sample};
use crate::sampling::{FaceBiased, MultiProposal, Pmf, PmfConvention, RedBiased, TARGET_PMF};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("importance weight for {card} is undefined: proposal density {denominator}")]
    UndefinedWeight { card: Card, denominator: f64 },
    #[error("{card} carries no proposal origin; memory-based weighting needs one")]
    MissingOrigin { card: Card },
}

/// Maps a drawn sample to its importance weight against the uniform target.
pub trait WeightingStrategy {
    /// Statistic name under which the strategy's weighted average is reported.
    fn label(&self) -> &str;

    fn weight(&self, sample: &Sample) -> Result<f64, WeightError>;
}

impl<S: WeightingStrategy + ?Sized> WeightingStrategy for &S {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn weight(&self, sample: &Sample) -> Result<f64, WeightError> {
        (**self).weight(sample)
    }
}

/// `target / denominator`, refusing densities that would produce inf or NaN.
fn ratio_to_target(card: Card, denominator: f64) -> Result<f64, WeightError> {
    if !denominator.is_finite() || denominator <= 0.0 {
        return Err(WeightError::UndefinedWeight { card, denominator });
    }
    Ok(TARGET_PMF / denominator)
}

/// Every sample counts once; the weighted average collapses to the naive one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unweighted;

impl WeightingStrategy for Unweighted {
    fn label(&self) -> &str {
        "unweighted_average"
    }

    fn weight(&self, _sample: &Sample) -> Result<f64, WeightError> {
        Ok(1.0)
    }
}

/// Single-proposal importance weight: `target / proposal.pmf(card)`.
#[derive(Debug, Clone)]
pub struct ImportanceWeight<P> {
    proposal: P,
    label: &'static str,
}

impl<P: Pmf> ImportanceWeight<P> {
    pub const DEFAULT_LABEL: &'static str = "weighted_average";

    pub fn new(proposal: P) -> Self {
        Self {
            proposal,
            label: Self::DEFAULT_LABEL,
        }
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn proposal(&self) -> &P {
        &self.proposal
    }
}

impl<P: Pmf> WeightingStrategy for ImportanceWeight<P> {
    fn label(&self) -> &str {
        self.label
    }

    fn weight(&self, sample: &Sample) -> Result<f64, WeightError> {
        ratio_to_target(sample.card, self.proposal.pmf(sample.card))
    }
}

/// MIS weight that divides by the PMF of the branch that actually generated the sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryWeight {
    mixture: MultiProposal,
}

impl MemoryWeight {
    pub const fn new(convention: PmfConvention) -> Self {
        Self {
            mixture: MultiProposal::new(convention),
        }
    }
}

impl WeightingStrategy for MemoryWeight {
    fn label(&self) -> &str {
        "memory_average"
    }

    fn weight(&self, sample: &Sample) -> Result<f64, WeightError> {
        let origin = sample
            .origin
            .ok_or(WeightError::MissingOrigin { card: sample.card })?;
        ratio_to_target(sample.card, self.mixture.origin_pmf(origin, sample.card))
    }
}

/// MIS weight against a fixed blend of both proposal PMFs, ignoring provenance.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceHeuristic {
    face: FaceBiased,
    red: RedBiased,
    mixing: MixingWeights,
}

impl BalanceHeuristic {
    pub const fn new(convention: PmfConvention, mixing: MixingWeights) -> Self {
        Self {
            face: FaceBiased::new(convention),
            red: RedBiased::new(convention),
            mixing,
        }
    }

    /// The blended density `face·p_face + red·p_red`.
    pub fn combined_pmf(&self, card: Card) -> f64 {
        self.mixing.face() * self.face.pmf(card) + self.mixing.red() * self.red.pmf(card)
    }
}

impl WeightingStrategy for BalanceHeuristic {
    fn label(&self) -> &str {
        "balance_average"
    }

    fn weight(&self, sample: &Sample) -> Result<f64, WeightError> {
        ratio_to_target(sample.card, self.combined_pmf(sample.card))
    }
}

/// The two MIS strategies compared side by side over the same mixture samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct MisStrategies {
    pub memory: MemoryWeight,
    pub balance: BalanceHeuristic,
}

impl MisStrategies {
    pub const fn new(convention: PmfConvention, mixing: MixingWeights) -> Self {
        Self {
            memory: MemoryWeight::new(convention),
            balance: BalanceHeuristic::new(convention, mixing),
        }
    }

    pub fn as_dyn(&self) -> [&dyn WeightingStrategy; 2] {
        [&self.memory, &self.balance]
    }
}
