//! Driver-owned sample logs and convergence history.

use super::stats::{RunningStats, recompute_stats};
use crate::model::Sample;
use crate::weighting::{WeightError, WeightingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Append-only record of every sample drawn so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleLog {
    samples: Vec<Sample>,
}

impl SampleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: impl Into<Sample>) {
        self.samples.push(sample.into());
    }

    /// Appends a batch and returns the newly added slice.
    pub fn extend<I, S>(&mut self, batch: I) -> &[Sample]
    where
        I: IntoIterator<Item = S>,
        S: Into<Sample>,
    {
        let start = self.samples.len();
        self.samples.extend(batch.into_iter().map(Into::into));
        &self.samples[start..]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// The first `n` samples, clamped to the log length.
    pub fn prefix(&self, n: usize) -> &[Sample] {
        &self.samples[..n.min(self.samples.len())]
    }

    /// The last `k` samples, oldest first.
    pub fn recent(&self, k: usize) -> &[Sample] {
        let start = self.samples.len().saturating_sub(k);
        &self.samples[start..]
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl<S: Into<Sample>> FromIterator<S> for SampleLog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Snapshot of all named statistics after `sample_count` samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleHistoryPoint {
    pub sample_count: usize,
    pub stats: BTreeMap<String, f64>,
}

impl SampleHistoryPoint {
    pub fn from_stats(stats: &RunningStats) -> Self {
        Self {
            sample_count: stats.sample_count,
            stats: stats.to_map(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.stats.get(name).copied()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history point for {attempted} samples recorded after {last}")]
    OutOfOrder { last: usize, attempted: usize },
}

/// History points ordered by sample count, one per processed batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    points: Vec<SampleHistoryPoint>,
}

impl ConvergenceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: &RunningStats) -> Result<&SampleHistoryPoint, HistoryError> {
        self.push_point(SampleHistoryPoint::from_stats(stats))
    }

    /// Appends a prepared point; sample counts must not decrease.
    pub fn push_point(
        &mut self,
        point: SampleHistoryPoint,
    ) -> Result<&SampleHistoryPoint, HistoryError> {
        if let Some(last) = self.points.last() {
            if point.sample_count < last.sample_count {
                return Err(HistoryError::OutOfOrder {
                    last: last.sample_count,
                    attempted: point.sample_count,
                });
            }
        }
        self.points.push(point);
        Ok(&self.points[self.points.len() - 1])
    }

    /// Rebuilds a history from scratch by recomputing at each checkpoint.
    pub fn replay(
        log: &SampleLog,
        strategies: &[&dyn WeightingStrategy],
        checkpoints: impl IntoIterator<Item = usize>,
    ) -> Result<Self, ReplayError> {
        let mut history = Self::new();
        for n in checkpoints {
            let stats = recompute_stats(log.prefix(n), strategies)?;
            history.record(&stats)?;
        }
        Ok(history)
    }

    pub fn points(&self) -> &[SampleHistoryPoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&SampleHistoryPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(sample_count, value)` pairs for one statistic.
    pub fn series(&self, name: &str) -> Vec<(usize, f64)> {
        self.points
            .iter()
            .filter_map(|point| point.get(name).map(|value| (point.sample_count, value)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error(transparent)]
    Weight(#[from] WeightError),
    #[error(transparent)]
    History(#[from] HistoryError),
}
