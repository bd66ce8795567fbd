//! Point estimates over a sample prefix.

use crate::model::Sample;
use crate::weighting::{WeightError, WeightingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NAIVE_AVERAGE: &str = "naive_average";
pub const FACE_CARD_PERCENTAGE: &str = "face_card_percentage";
const ESS_SUFFIX: &str = "_ess";

/// Self-normalized estimate produced by one weighting strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyEstimate {
    pub average: f64,
    /// Kish effective sample size `(Σw)² / Σw²`.
    pub effective_sample_size: f64,
}

/// Statistics reflecting the first `sample_count` samples of a log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub sample_count: usize,
    pub naive_average: f64,
    pub face_card_percentage: f64,
    /// Keyed by [`WeightingStrategy::label`].
    pub weighted: BTreeMap<String, StrategyEstimate>,
}

impl RunningStats {
    /// Looks up a statistic by name, including `<label>_ess` for effective sample sizes.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            NAIVE_AVERAGE => Some(self.naive_average),
            FACE_CARD_PERCENTAGE => Some(self.face_card_percentage),
            other => {
                if let Some(estimate) = self.weighted.get(other) {
                    return Some(estimate.average);
                }
                other
                    .strip_suffix(ESS_SUFFIX)
                    .and_then(|label| self.weighted.get(label))
                    .map(|estimate| estimate.effective_sample_size)
            }
        }
    }

    pub fn weighted_average(&self, label: &str) -> Option<f64> {
        self.weighted.get(label).map(|estimate| estimate.average)
    }

    /// Flat `name -> value` view used for history snapshots.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut values = BTreeMap::new();
        values.insert(NAIVE_AVERAGE.to_string(), self.naive_average);
        values.insert(FACE_CARD_PERCENTAGE.to_string(), self.face_card_percentage);
        for (label, estimate) in &self.weighted {
            values.insert(label.clone(), estimate.average);
            values.insert(
                format!("{label}{ESS_SUFFIX}"),
                estimate.effective_sample_size,
            );
        }
        values
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct WeightSums {
    weighted_value: f64,
    weight: f64,
    weight_squared: f64,
}

impl WeightSums {
    fn add(&mut self, value: f64, weight: f64) {
        self.weighted_value += value * weight;
        self.weight += weight;
        self.weight_squared += weight * weight;
    }

    fn estimate(&self) -> StrategyEstimate {
        let average = if self.weight > 0.0 {
            self.weighted_value / self.weight
        } else {
            0.0
        };
        let effective_sample_size = if self.weight_squared > 0.0 {
            self.weight * self.weight / self.weight_squared
        } else {
            0.0
        };
        StrategyEstimate {
            average,
            effective_sample_size,
        }
    }
}

fn finish(
    count: usize,
    rank_sum: f64,
    face_count: usize,
    strategies: &[&dyn WeightingStrategy],
    sums: &[WeightSums],
) -> RunningStats {
    let (naive_average, face_card_percentage) = if count == 0 {
        (0.0, 0.0)
    } else {
        (
            rank_sum / count as f64,
            face_count as f64 / count as f64 * 100.0,
        )
    };
    let weighted = strategies
        .iter()
        .zip(sums)
        .map(|(strategy, sums)| (strategy.label().to_string(), sums.estimate()))
        .collect();
    RunningStats {
        sample_count: count,
        naive_average,
        face_card_percentage,
        weighted,
    }
}

/// Recomputes every statistic from scratch over `samples`.
///
/// Fails on the first sample whose weight is undefined under any strategy.
pub fn recompute_stats(
    samples: &[Sample],
    strategies: &[&dyn WeightingStrategy],
) -> Result<RunningStats, WeightError> {
    let mut rank_sum = 0.0;
    let mut face_count = 0usize;
    let mut sums = vec![WeightSums::default(); strategies.len()];

    for sample in samples {
        let value = f64::from(sample.card.value());
        rank_sum += value;
        if sample.card.is_face() {
            face_count += 1;
        }
        for (strategy, slot) in strategies.iter().zip(sums.iter_mut()) {
            slot.add(value, strategy.weight(sample)?);
        }
    }

    Ok(finish(
        samples.len(),
        rank_sum,
        face_count,
        strategies,
        &sums,
    ))
}

/// Incremental counterpart of [`recompute_stats`].
///
/// Snapshots after `n` pushes equal `recompute_stats(&samples[..n])` exactly because both sum in
/// the same order.
#[derive(Clone)]
pub struct RunningTotals<'s> {
    strategies: &'s [&'s dyn WeightingStrategy],
    count: usize,
    rank_sum: f64,
    face_count: usize,
    sums: Vec<WeightSums>,
}

impl<'s> RunningTotals<'s> {
    pub fn new(strategies: &'s [&'s dyn WeightingStrategy]) -> Self {
        Self {
            strategies,
            count: 0,
            rank_sum: 0.0,
            face_count: 0,
            sums: vec![WeightSums::default(); strategies.len()],
        }
    }

    /// Folds one sample in. On error the totals are left untouched.
    pub fn push(&mut self, sample: &Sample) -> Result<(), WeightError> {
        let weights = self
            .strategies
            .iter()
            .map(|strategy| strategy.weight(sample))
            .collect::<Result<Vec<_>, _>>()?;

        let value = f64::from(sample.card.value());
        self.count += 1;
        self.rank_sum += value;
        if sample.card.is_face() {
            self.face_count += 1;
        }
        for (slot, weight) in self.sums.iter_mut().zip(weights) {
            slot.add(value, weight);
        }
        Ok(())
    }

    pub fn extend<'a, I>(&mut self, samples: I) -> Result<(), WeightError>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        for sample in samples {
            self.push(sample)?;
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Running `(Σ value·w, Σ w)` for the strategy labelled `label`.
    pub fn sums(&self, label: &str) -> Option<(f64, f64)> {
        self.strategies
            .iter()
            .position(|strategy| strategy.label() == label)
            .map(|idx| (self.sums[idx].weighted_value, self.sums[idx].weight))
    }

    pub fn snapshot(&self) -> RunningStats {
        finish(
            self.count,
            self.rank_sum,
            self.face_count,
            self.strategies,
            &self.sums,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, Rank, Suit};
    use crate::sampling::{FaceBiased, MultiProposal, PmfConvention, Proposal, Uniform};
    use crate::weighting::{ImportanceWeight, MisStrategies, MixingWeights, Unweighted};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOL: f64 = 1e-9;

    fn scenario_cards() -> Vec<Sample> {
        vec![
            Sample::from(Card::new(Rank::King, Suit::Spades)),
            Sample::from(Card::new(Rank::Two, Suit::Hearts)),
            Sample::from(Card::new(Rank::King, Suit::Diamonds)),
            Sample::from(Card::new(Rank::Seven, Suit::Clubs)),
        ]
    }

    #[test]
    fn empty_log_yields_zeros() {
        let importance = ImportanceWeight::new(FaceBiased::default());
        let mis = MisStrategies::default();
        let stats =
            recompute_stats(&[], &[&importance, &mis.memory, &mis.balance]).expect("no samples");
        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.naive_average, 0.0);
        assert_eq!(stats.face_card_percentage, 0.0);
        for label in ["weighted_average", "memory_average", "balance_average"] {
            assert_eq!(stats.weighted_average(label), Some(0.0));
            assert_eq!(stats.get(&format!("{label}_ess")), Some(0.0));
        }
    }

    #[test]
    fn four_card_face_biased_scenario() {
        let importance = ImportanceWeight::new(FaceBiased::default());
        let samples = scenario_cards();

        let weights: Vec<f64> = samples
            .iter()
            .map(|s| importance.weight(s).unwrap())
            .collect();
        let expected = [1.0 / 3.0, 1.0, 1.0 / 3.0, 1.0];
        for (got, want) in weights.iter().zip(expected) {
            assert!((got - want).abs() < TOL);
        }

        let stats = recompute_stats(&samples, &[&importance]).unwrap();
        assert!((stats.naive_average - 8.75).abs() < TOL);
        assert!((stats.weighted_average("weighted_average").unwrap() - 6.625).abs() < TOL);
        assert!((stats.face_card_percentage - 50.0).abs() < TOL);
    }

    #[test]
    fn unit_weights_reduce_to_naive_average() {
        let importance = ImportanceWeight::new(Uniform);
        let mut rng = StdRng::seed_from_u64(21);
        let samples: Vec<Sample> = Uniform
            .draw_many(500, &mut rng)
            .into_iter()
            .map(Sample::from)
            .collect();
        let stats = recompute_stats(&samples, &[&importance, &Unweighted]).unwrap();
        assert!((stats.weighted_average("weighted_average").unwrap() - stats.naive_average).abs() < TOL);
        assert!((stats.weighted_average("unweighted_average").unwrap() - stats.naive_average).abs() < TOL);
        assert!((stats.get("unweighted_average_ess").unwrap() - 500.0).abs() < TOL);
    }

    #[test]
    fn incremental_totals_match_scratch_recomputation_at_every_prefix() {
        let mixture = MultiProposal::default();
        let mis = MisStrategies::default();
        let importance = ImportanceWeight::new(FaceBiased::default());
        let strategies: [&dyn WeightingStrategy; 3] = [&importance, &mis.memory, &mis.balance];

        let mut rng = StdRng::seed_from_u64(99);
        let samples: Vec<Sample> = mixture
            .draw_many(600, &mut rng)
            .into_iter()
            .map(Sample::from)
            .collect();

        let mut totals = RunningTotals::new(&strategies);
        assert_eq!(totals.snapshot(), recompute_stats(&[], &strategies).unwrap());
        for batch in samples.chunks(37) {
            totals.extend(batch).unwrap();
            let scratch = recompute_stats(&samples[..totals.count()], &strategies).unwrap();
            assert_eq!(totals.snapshot(), scratch);
        }
        assert_eq!(totals.count(), samples.len());
    }

    #[test]
    fn failed_push_leaves_totals_untouched() {
        let mis = MisStrategies::default();
        let strategies: [&dyn WeightingStrategy; 1] = [&mis.memory];
        let mut totals = RunningTotals::new(&strategies);
        totals
            .push(&Sample::tagged(
                Card::new(Rank::Ace, Suit::Clubs),
                crate::model::Origin::Face,
            ))
            .unwrap();
        let before = totals.snapshot();
        assert!(
            totals
                .push(&Sample::from(Card::new(Rank::Ace, Suit::Hearts)))
                .is_err()
        );
        assert_eq!(totals.snapshot(), before);
        assert_eq!(totals.sums("memory_average"), Some((1.0, 1.0)));
    }

    #[test]
    fn flat_map_exposes_every_statistic() {
        let mis = MisStrategies::new(PmfConvention::Normalized, MixingWeights::default());
        let samples: Vec<Sample> = scenario_cards()
            .into_iter()
            .map(|s| Sample::tagged(s.card, crate::model::Origin::Red))
            .collect();
        let stats = recompute_stats(&samples, &mis.as_dyn()).unwrap();
        let map = stats.to_map();
        assert_eq!(
            map.keys().cloned().collect::<Vec<_>>(),
            vec![
                "balance_average",
                "balance_average_ess",
                "face_card_percentage",
                "memory_average",
                "memory_average_ess",
                "naive_average",
            ]
        );
        for (name, value) in &map {
            assert_eq!(stats.get(name), Some(*value));
        }
    }
}
