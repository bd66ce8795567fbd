//! Step-by-step replay of a short, fixed sample sequence.

use super::stats::{RunningStats, RunningTotals};
use crate::model::Sample;
use crate::weighting::{WeightError, WeightingStrategy};
use serde::{Deserialize, Serialize};

/// Number of samples the classroom walkthroughs draw up front.
pub const WALKTHROUGH_SAMPLES: usize = 50;

/// Per-strategy detail at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepWeight {
    pub label: String,
    pub weight: f64,
    /// `Σ value·w` over samples `0..=index`.
    pub weighted_sum: f64,
    /// `Σ w` over samples `0..=index`.
    pub weight_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkthroughStep {
    pub index: usize,
    pub sample: Sample,
    pub value: u8,
    pub weights: Vec<StepWeight>,
    pub running: RunningStats,
}

/// Precomputed steps plus a cursor with previous/next/reset navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Walkthrough {
    steps: Vec<WalkthroughStep>,
    cursor: usize,
}

impl Walkthrough {
    pub fn build(
        samples: &[Sample],
        strategies: &[&dyn WeightingStrategy],
    ) -> Result<Self, WeightError> {
        let mut totals = RunningTotals::new(strategies);
        let mut steps = Vec::with_capacity(samples.len());

        for (index, sample) in samples.iter().enumerate() {
            totals.push(sample)?;
            let mut weights = Vec::with_capacity(strategies.len());
            for strategy in strategies {
                let label = strategy.label();
                let (weighted_sum, weight_sum) = totals.sums(label).unwrap_or((0.0, 0.0));
                weights.push(StepWeight {
                    label: label.to_string(),
                    weight: strategy.weight(sample)?,
                    weighted_sum,
                    weight_sum,
                });
            }
            steps.push(WalkthroughStep {
                index,
                sample: *sample,
                value: sample.card.value(),
                weights,
                running: totals.snapshot(),
            });
        }

        Ok(Self { steps, cursor: 0 })
    }

    pub fn steps(&self) -> &[WalkthroughStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&WalkthroughStep> {
        self.steps.get(self.cursor)
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor + 1 >= self.steps.len()
    }

    /// Advances one step; returns `false` when already on the last step.
    pub fn next(&mut self) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
