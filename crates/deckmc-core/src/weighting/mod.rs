//! Importance weights relative to the uniform target.
//!
//! - `strategy`: the [`WeightingStrategy`] seam and the naive, single-proposal, memory-based and
//!   balance-heuristic implementations.
//! - `mixing`: validated mixing weights for the balance heuristic.

mod mixing;
mod strategy;

pub use mixing::{MIXING_TOLERANCE, MixingError, MixingWeights};
pub use strategy::{
    BalanceHeuristic, ImportanceWeight, MemoryWeight, MisStrategies, Unweighted, WeightError,
    WeightingStrategy,
};

use crate::model::{Card, Origin, Sample};

/// Weight of a single card (and optional origin tag) under `strategy`.
pub fn weight<S: WeightingStrategy + ?Sized>(
    strategy: &S,
    card: Card,
    origin: Option<Origin>,
) -> Result<f64, WeightError> {
    strategy.weight(&Sample { card, origin })
}
