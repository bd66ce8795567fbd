//! Running statistics over explicit sample logs.
//!
//! Nothing here keeps hidden state between calls: the driver owns the [`SampleLog`] and every
//! statistic is a pure function of a log prefix.

mod history;
mod stats;
mod walkthrough;

pub use history::{
    ConvergenceHistory, HistoryError, ReplayError, SampleHistoryPoint, SampleLog,
};
pub use stats::{
    FACE_CARD_PERCENTAGE, NAIVE_AVERAGE, RunningStats, RunningTotals, StrategyEstimate,
    recompute_stats,
};
pub use walkthrough::{StepWeight, WALKTHROUGH_SAMPLES, Walkthrough, WalkthroughStep};
