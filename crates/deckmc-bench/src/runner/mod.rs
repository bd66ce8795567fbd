mod recent;
mod scenario;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use deckmc_core::estimator::{
    ConvergenceHistory, HistoryError, NAIVE_AVERAGE, SampleHistoryPoint, SampleLog, Walkthrough,
    WalkthroughStep, recompute_stats,
};
use deckmc_core::model::Sample;
use deckmc_core::poker::{PokerDeal, PokerTally, deal_pair, recent_both_straights};
use deckmc_core::weighting::WeightError;
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{
    AnalyticsError, ConvergenceReport, PokerReport, WIN_RATE, card_estimates, poker_estimates,
};
use crate::config::{BenchConfig, ResolvedOutputs, ScenarioKind};

pub use recent::RecentSamples;
pub use scenario::{EstimationPlan, Sampler};

/// Both-straight hands listed in the poker summary.
const POKER_RECENT_BOTH: usize = 5;
const PREALLOC_LIMIT: usize = 16_384;

/// Primary entry point for driving one scenario to its sample ceiling.
pub struct ScenarioRunner {
    config: BenchConfig,
    outputs: ResolvedOutputs,
    logging_enabled: bool,
}

/// Summary details returned after a run.
#[derive(Debug)]
pub struct RunSummary {
    pub scenario: ScenarioKind,
    pub samples_drawn: usize,
    pub batches: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub report: ConvergenceReport,
}

#[derive(Serialize)]
struct HistoryRow<'a> {
    run_id: &'a str,
    scenario: &'static str,
    batch_index: usize,
    #[serde(flatten)]
    point: &'a SampleHistoryPoint,
    recent: Vec<String>,
}

#[derive(Serialize)]
struct WalkthroughRow<'a> {
    run_id: &'a str,
    scenario: &'static str,
    #[serde(flatten)]
    step: &'a WalkthroughStep,
}

impl ScenarioRunner {
    /// Build a runner from a validated configuration.
    ///
    /// Card scenarios have their weights checked over the whole support here, so an undefined
    /// weight fails before any sample is drawn.
    pub fn new(config: BenchConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        if let Some(plan) = EstimationPlan::for_scenario(&config.scenario) {
            plan.expected_values()?;
        }

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
        })
    }

    /// Execute the scenario, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.history_jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.history_jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.scenario.seed.unwrap_or(0));
        let kind = self.config.scenario.kind;

        event!(
            target: "deckmc_bench::run",
            Level::INFO,
            run_id = %self.config.run_id,
            scenario = kind.as_str(),
            seed = self.config.scenario.seed.unwrap_or(0),
            batch_size = self.config.scenario.batch_size(),
            sample_limit = self.config.scenario.sample_limit(),
            pmf_convention = self.config.scenario.pmf_convention.as_str(),
            "scenario started"
        );

        let (report, rows_written) = match kind {
            ScenarioKind::PokerStraight => self.run_poker(&mut writer, &mut rng)?,
            k if k.is_walkthrough() => self.run_walkthrough(&mut writer, &mut rng)?,
            _ => self.run_estimation(&mut writer, &mut rng)?,
        };

        writer.flush()?;

        report.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match report.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                event!(target: "deckmc_bench::run", Level::WARN, error = %err, "plot skipped");
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_path = self
            .logging_enabled
            .then(|| self.outputs.run_dir().join("telemetry.jsonl"));

        event!(
            target: "deckmc_bench::run",
            Level::INFO,
            run_id = %self.config.run_id,
            scenario = kind.as_str(),
            samples = report.sample_count,
            batches = report.batches,
            rows = rows_written,
            "scenario complete"
        );

        Ok(RunSummary {
            scenario: kind,
            samples_drawn: report.sample_count,
            batches: report.batches,
            rows_written,
            jsonl_path: self.outputs.history_jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            report,
        })
    }

    fn plan(&self) -> Result<EstimationPlan, RunnerError> {
        EstimationPlan::for_scenario(&self.config.scenario).ok_or(RunnerError::Scenario {
            kind: self.config.scenario.kind.as_str(),
        })
    }

    fn new_report(&self) -> ConvergenceReport {
        ConvergenceReport::new(
            &self.config.run_id,
            self.config.scenario.kind,
            self.config.scenario.pmf_convention,
        )
    }

    /// Batch loop for the convergence scenarios: extend the log, recompute, record a point.
    fn run_estimation(
        &self,
        writer: &mut BufWriter<File>,
        rng: &mut StdRng,
    ) -> Result<(ConvergenceReport, usize), RunnerError> {
        let plan = self.plan()?;
        let strategies = plan.strategies();
        let scenario = &self.config.scenario;
        let batch_size = scenario.batch_size();
        let limit = scenario.sample_limit();
        let tick = scenario.tick_interval();

        let mut log = SampleLog::with_capacity(limit.min(PREALLOC_LIMIT));
        let mut history = ConvergenceHistory::new();
        let mut recent = RecentSamples::new(self.config.recent.capacity, self.config.recent.display);
        let mut rows_written = 0usize;
        let mut stats = recompute_stats(log.as_slice(), &strategies)?;

        while log.len() < limit {
            let take = batch_size.min(limit - log.len());
            let batch = plan.sampler.draw_batch(take, rng);
            if self.logging_enabled && self.config.logging.sample_details {
                self.log_samples(log.len(), &batch);
            }
            recent.extend(batch.iter().map(describe_sample));
            log.extend(batch);

            stats = recompute_stats(log.as_slice(), &strategies)?;
            let point = history.record(&stats)?;
            let row = HistoryRow {
                run_id: &self.config.run_id,
                scenario: scenario.kind.as_str(),
                batch_index: rows_written,
                point,
                recent: recent.displayed().cloned().collect(),
            };
            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;

            if self.logging_enabled && tracing::enabled!(Level::DEBUG) {
                event!(
                    target: "deckmc_bench::batch",
                    Level::DEBUG,
                    run_id = %self.config.run_id,
                    batch_index = rows_written - 1,
                    sample_count = stats.sample_count,
                    naive_average = stats.naive_average,
                    face_card_percentage = stats.face_card_percentage,
                    weighted = ?stats.weighted,
                );
            }

            if let Some(interval) = tick {
                thread::sleep(interval);
            }
        }

        let expected = plan.expected_values()?;
        let mut report = self.new_report();
        report.sample_count = log.len();
        report.batches = rows_written;
        report.estimates = card_estimates(log.as_slice(), &strategies, &stats, &expected)?;
        report.recent = recent.displayed().cloned().collect();
        report.plot_series = std::iter::once(NAIVE_AVERAGE)
            .chain(strategies.iter().map(|s| s.label()))
            .map(str::to_string)
            .collect();
        report.history = history;
        Ok((report, rows_written))
    }

    /// Draws the fixed walkthrough sequence once, then steps through it.
    fn run_walkthrough(
        &self,
        writer: &mut BufWriter<File>,
        rng: &mut StdRng,
    ) -> Result<(ConvergenceReport, usize), RunnerError> {
        let plan = self.plan()?;
        let strategies = plan.strategies();
        let log: SampleLog = plan
            .sampler
            .draw_batch(self.config.scenario.sample_limit(), rng)
            .into_iter()
            .collect();

        let mut walkthrough = Walkthrough::build(log.as_slice(), &strategies)?;
        let mut history = ConvergenceHistory::new();
        let mut steps = Vec::with_capacity(walkthrough.len());
        let mut rows_written = 0usize;

        walkthrough.reset();
        while let Some(step) = walkthrough.current() {
            let row = WalkthroughRow {
                run_id: &self.config.run_id,
                scenario: self.config.scenario.kind.as_str(),
                step,
            };
            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;
            history.record(&step.running)?;
            steps.push(step.clone());
            if !walkthrough.next() {
                break;
            }
        }

        let stats = recompute_stats(log.as_slice(), &strategies)?;
        let expected = plan.expected_values()?;
        let mut report = self.new_report();
        report.sample_count = log.len();
        report.batches = 1;
        report.estimates = card_estimates(log.as_slice(), &strategies, &stats, &expected)?;
        report.recent = log
            .recent(self.config.recent.display)
            .iter()
            .map(describe_sample)
            .collect();
        report.plot_series = std::iter::once(NAIVE_AVERAGE)
            .chain(strategies.iter().map(|s| s.label()))
            .map(str::to_string)
            .collect();
        report.history = history;
        report.walkthrough = steps;
        Ok((report, rows_written))
    }

    fn run_poker(
        &self,
        writer: &mut BufWriter<File>,
        rng: &mut StdRng,
    ) -> Result<(ConvergenceReport, usize), RunnerError> {
        let scenario = &self.config.scenario;
        let batch_size = scenario.batch_size();
        let limit = scenario.sample_limit();
        let tick = scenario.tick_interval();

        let mut deals: Vec<PokerDeal> = Vec::with_capacity(limit.min(PREALLOC_LIMIT));
        let mut history = ConvergenceHistory::new();
        let mut recent = RecentSamples::new(self.config.recent.capacity, self.config.recent.display);
        let mut rows_written = 0usize;

        while deals.len() < limit {
            let take = batch_size.min(limit - deals.len());
            for _ in 0..take {
                let deal = deal_pair(rng);
                recent.push(format!("A: {} | B: {}", deal.player_a, deal.player_b));
                deals.push(deal);
            }

            let tally = PokerTally::recompute(&deals);
            let point = history.push_point(poker_point(&tally))?;
            let row = HistoryRow {
                run_id: &self.config.run_id,
                scenario: scenario.kind.as_str(),
                batch_index: rows_written,
                point,
                recent: recent.displayed().cloned().collect(),
            };
            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;

            if self.logging_enabled && tracing::enabled!(Level::DEBUG) {
                event!(
                    target: "deckmc_bench::batch",
                    Level::DEBUG,
                    run_id = %self.config.run_id,
                    batch_index = rows_written - 1,
                    sample_count = tally.sample_count,
                    both_straights = tally.both_straights,
                    player_a_wins = tally.player_a_wins,
                );
            }

            if let Some(interval) = tick {
                thread::sleep(interval);
            }
        }

        let tally = PokerTally::recompute(&deals);
        let mut report = self.new_report();
        report.sample_count = deals.len();
        report.batches = rows_written;
        report.estimates = poker_estimates(&tally)?;
        report.recent = recent.displayed().cloned().collect();
        report.plot_series = vec![WIN_RATE.to_string()];
        report.history = history;
        report.poker = Some(PokerReport {
            recent_both_straights: recent_both_straights(&deals, POKER_RECENT_BOTH),
            tally,
        });
        Ok((report, rows_written))
    }

    fn log_samples(&self, offset: usize, batch: &[Sample]) {
        for (idx, sample) in batch.iter().enumerate() {
            event!(
                target: "deckmc_bench::sample",
                Level::TRACE,
                run_id = %self.config.run_id,
                sample_index = offset + idx,
                card = %sample.card,
                value = sample.card.value(),
                origin = sample.origin.map(|o| o.as_str()).unwrap_or("none"),
            );
        }
    }
}

fn poker_point(tally: &PokerTally) -> SampleHistoryPoint {
    let mut stats = BTreeMap::new();
    stats.insert(WIN_RATE.to_string(), tally.win_rate());
    stats.insert("both_straights".to_string(), tally.both_straights as f64);
    stats.insert("player_a_wins".to_string(), tally.player_a_wins as f64);
    SampleHistoryPoint {
        sample_count: tally.sample_count,
        stats,
    }
}

fn describe_sample(sample: &Sample) -> String {
    match sample.origin {
        Some(origin) => format!("{}({})", sample.card, origin.as_str()),
        None => sample.card.to_string(),
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize history row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("scenario '{kind}' has no sampling plan")]
    Scenario { kind: &'static str },
    #[error("estimator failed: {0}")]
    Weight(#[from] WeightError),
    #[error("history out of order: {0}")]
    History(#[from] HistoryError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckmc_core::model::{Card, Origin, Rank, Suit};

    #[test]
    fn samples_render_with_origin_tag() {
        let card = Card::new(Rank::King, Suit::Spades);
        assert_eq!(describe_sample(&Sample::from(card)), "K♠️");
        assert_eq!(
            describe_sample(&Sample::tagged(card, Origin::Face)),
            "K♠️(face)"
        );
    }

    #[test]
    fn poker_point_carries_win_rate() {
        let point = poker_point(&PokerTally::default());
        assert_eq!(point.sample_count, 0);
        assert_eq!(point.get(WIN_RATE), Some(0.0));
    }
}
