use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use deckmc_core::estimator::{
    ConvergenceHistory, FACE_CARD_PERCENTAGE, NAIVE_AVERAGE, RunningStats, WalkthroughStep,
};
use deckmc_core::model::Sample;
use deckmc_core::poker::{PokerDeal, PokerTally};
use deckmc_core::sampling::PmfConvention;
use deckmc_core::weighting::{WeightError, WeightingStrategy};
use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::ScenarioKind;

const CONFIDENCE_LEVEL: f64 = 0.95;
pub const WIN_RATE: &str = "win_rate";

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("weight undefined while building confidence intervals: {0}")]
    Weight(#[from] WeightError),
    #[error("normal distribution unavailable: {0}")]
    Distribution(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Two-sided critical value for [`CONFIDENCE_LEVEL`].
fn critical_z() -> Result<f64, AnalyticsError> {
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AnalyticsError::Distribution(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0))
}

/// One reported statistic with its large-sample limit and interval.
#[derive(Debug, Clone, Serialize)]
pub struct EstimateReport {
    pub name: String,
    pub value: f64,
    pub expected: Option<f64>,
    pub ci95: Option<(f64, f64)>,
    pub effective_sample_size: Option<f64>,
}

impl EstimateReport {
    pub fn deviation(&self) -> Option<f64> {
        self.expected.map(|expected| self.value - expected)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PokerReport {
    pub tally: PokerTally,
    pub recent_both_straights: Vec<PokerDeal>,
}

/// Everything the summary and plot need from a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceReport {
    pub run_id: String,
    pub scenario: ScenarioKind,
    pub pmf_convention: PmfConvention,
    pub sample_count: usize,
    pub batches: usize,
    pub estimates: Vec<EstimateReport>,
    pub recent: Vec<String>,
    #[serde(skip)]
    pub history: ConvergenceHistory,
    /// Statistic names drawn on the convergence plot.
    pub plot_series: Vec<String>,
    pub walkthrough: Vec<WalkthroughStep>,
    pub poker: Option<PokerReport>,
}

impl ConvergenceReport {
    pub fn new(run_id: &str, scenario: ScenarioKind, pmf_convention: PmfConvention) -> Self {
        Self {
            run_id: run_id.to_string(),
            scenario,
            pmf_convention,
            sample_count: 0,
            batches: 0,
            estimates: Vec::new(),
            recent: Vec::new(),
            history: ConvergenceHistory::new(),
            plot_series: Vec::new(),
            walkthrough: Vec::new(),
            poker: None,
        }
    }

    pub fn estimate(&self, name: &str) -> Option<&EstimateReport> {
        self.estimates.iter().find(|e| e.name == name)
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut out = String::new();
        let _ = writeln!(out, "# Convergence Summary: {}\n", self.run_id);
        let _ = writeln!(
            out,
            "Scenario `{}`, PMF convention `{}`, {} samples over {} batches\n",
            self.scenario.as_str(),
            self.pmf_convention.as_str(),
            self.sample_count,
            self.batches
        );

        out.push_str("| Statistic | Value | Expected | Deviation | 95% CI | ESS |\n");
        out.push_str("|-----------|-------|----------|-----------|--------|-----|\n");
        for estimate in &self.estimates {
            let _ = writeln!(
                out,
                "| {name} | {value:.4} | {expected} | {deviation} | {ci} | {ess} |",
                name = estimate.name,
                value = estimate.value,
                expected = fmt_opt(estimate.expected, |v| format!("{v:.4}")),
                deviation = fmt_opt(estimate.deviation(), |v| format!("{v:+.4}")),
                ci = fmt_opt(estimate.ci95, |(lo, hi)| format!("[{lo:.4}, {hi:.4}]")),
                ess = fmt_opt(estimate.effective_sample_size, |v| format!("{v:.1}")),
            );
        }

        if !self.recent.is_empty() {
            let _ = writeln!(out, "\nRecent samples: {}", self.recent.join(" "));
        }

        if !self.walkthrough.is_empty() {
            out.push_str("\n## Walkthrough\n\n");
            out.push_str("| # | Card | Origin | Value | Weights | Running averages |\n");
            out.push_str("|---|------|--------|-------|---------|------------------|\n");
            for step in &self.walkthrough {
                let weights = step
                    .weights
                    .iter()
                    .map(|w| format!("{}={:.3}", w.label, w.weight))
                    .collect::<Vec<_>>()
                    .join(", ");
                let averages = step
                    .running
                    .weighted
                    .iter()
                    .map(|(label, estimate)| format!("{label}={:.3}", estimate.average))
                    .chain(std::iter::once(format!(
                        "{NAIVE_AVERAGE}={:.3}",
                        step.running.naive_average
                    )))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} |",
                    step.index + 1,
                    step.sample.card,
                    step.sample.origin.map(|o| o.as_str()).unwrap_or("-"),
                    step.value,
                    if weights.is_empty() { "-".to_string() } else { weights },
                    averages,
                );
            }
        }

        if let Some(poker) = &self.poker {
            out.push_str("\n## Poker straights\n\n");
            let tally = &poker.tally;
            let _ = writeln!(
                out,
                "Both straights: {} of {} deals; player A won {} ({:.1}%)\n",
                tally.both_straights,
                tally.sample_count,
                tally.player_a_wins,
                tally.win_rate() * 100.0
            );
            for (proposal, count) in &tally.by_proposal {
                let _ = writeln!(out, "- {proposal:?}: {count} deals");
            }
            if !poker.recent_both_straights.is_empty() {
                out.push_str("\nRecent hands where both players held a straight:\n\n");
                for deal in &poker.recent_both_straights {
                    let _ = writeln!(
                        out,
                        "- A: {} | B: {} | winner: {}",
                        deal.player_a,
                        deal.player_b,
                        deal.winner.map(|p| format!("{p:?}")).unwrap_or_default()
                    );
                }
            }
        }

        fs::write(path.as_ref(), out).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("convergence.png");
        let series: Vec<(String, Vec<(usize, f64)>, Option<f64>)> = self
            .plot_series
            .iter()
            .map(|name| {
                let expected = self.estimate(name).and_then(|e| e.expected);
                (name.clone(), self.history.series(name), expected)
            })
            .filter(|(_, points, _)| !points.is_empty())
            .collect();
        if series.is_empty() {
            return Err(AnalyticsError::Plot("no history to plot".into()));
        }
        let x_max = self
            .history
            .last()
            .map(|p| p.sample_count)
            .unwrap_or(1)
            .max(1);
        let title = format!("{} convergence", self.scenario.as_str());

        let target_path = output_path.clone();
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let values = series.iter().flat_map(|(_, points, expected)| {
                points.iter().map(|(_, v)| *v).chain(expected.iter().copied())
            });
            let (y_min, y_max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |acc, v| {
                (acc.0.min(v), acc.1.max(v))
            });
            let margin = ((y_max - y_min).abs() * 0.1).max(0.2);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(title, ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 40)
                .build_cartesian_2d(0..x_max, (y_min - margin)..(y_max + margin))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .x_desc("Samples")
                .y_desc("Estimate")
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let palette = [&BLUE, &RED, &GREEN, &MAGENTA, &CYAN];
            for (idx, (name, points, expected)) in series.iter().enumerate() {
                let color = palette[idx % palette.len()];
                chart
                    .draw_series(std::iter::once(PathElement::new(points.clone(), color)))
                    .map_err(|e| AnalyticsError::Plot(e.to_string()))?
                    .label(name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                if let Some(target) = expected {
                    chart
                        .draw_series(std::iter::once(PathElement::new(
                            vec![(0, *target), (x_max, *target)],
                            color.mix(0.35),
                        )))
                        .map_err(|e| AnalyticsError::Plot(e.to_string()))?;
                }
            }

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        let result = match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        };
        if result.is_err() && target_path.exists() {
            // Drop any partially written image.
            let _ = fs::remove_file(&target_path);
        }
        result
    }
}

fn fmt_opt<T>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map(f).unwrap_or_else(|| "-".to_string())
}

/// Final estimates for a card scenario, with normal-approximation intervals.
///
/// The weighted intervals use the delta-method variance of the self-normalized estimator,
/// `Σ w²(x - μ)² / (Σ w)²`.
pub fn card_estimates(
    samples: &[Sample],
    strategies: &[&dyn WeightingStrategy],
    stats: &RunningStats,
    expected: &BTreeMap<String, f64>,
) -> Result<Vec<EstimateReport>, AnalyticsError> {
    let z = critical_z()?;
    let n = samples.len();
    let values: Vec<f64> = samples
        .iter()
        .map(|s| f64::from(s.card.value()))
        .collect();

    let mut reports = Vec::with_capacity(strategies.len() + 2);
    reports.push(EstimateReport {
        name: NAIVE_AVERAGE.to_string(),
        value: stats.naive_average,
        expected: expected.get(NAIVE_AVERAGE).copied(),
        ci95: mean_interval(&values, z),
        effective_sample_size: None,
    });

    let share = stats.face_card_percentage / 100.0;
    reports.push(EstimateReport {
        name: FACE_CARD_PERCENTAGE.to_string(),
        value: stats.face_card_percentage,
        expected: expected.get(FACE_CARD_PERCENTAGE).copied(),
        ci95: proportion_interval(share, n, z).map(|(lo, hi)| (lo * 100.0, hi * 100.0)),
        effective_sample_size: None,
    });

    for strategy in strategies {
        let label = strategy.label();
        let Some(estimate) = stats.weighted.get(label) else {
            continue;
        };
        let mut weight_sum = 0.0;
        let mut spread = 0.0;
        for (sample, value) in samples.iter().zip(&values) {
            let w = strategy.weight(sample)?;
            weight_sum += w;
            spread += w * w * (value - estimate.average).powi(2);
        }
        let ci95 = (n > 1 && weight_sum > 0.0).then(|| {
            let margin = z * spread.sqrt() / weight_sum;
            (estimate.average - margin, estimate.average + margin)
        });
        reports.push(EstimateReport {
            name: label.to_string(),
            value: estimate.average,
            expected: expected.get(label).copied(),
            ci95,
            effective_sample_size: Some(estimate.effective_sample_size),
        });
    }

    Ok(reports)
}

/// Win-rate estimate for the poker demo; the placeholder coin flip makes 0.5 the target.
pub fn poker_estimates(tally: &PokerTally) -> Result<Vec<EstimateReport>, AnalyticsError> {
    let z = critical_z()?;
    let win_rate = tally.win_rate();
    let straight_rate = |count: usize| {
        if tally.sample_count == 0 {
            0.0
        } else {
            count as f64 / tally.sample_count as f64
        }
    };
    let rate_a = straight_rate(tally.straight_a);
    let rate_b = straight_rate(tally.straight_b);

    Ok(vec![
        EstimateReport {
            name: WIN_RATE.to_string(),
            value: win_rate,
            expected: Some(0.5),
            ci95: proportion_interval(win_rate, tally.both_straights, z),
            effective_sample_size: None,
        },
        EstimateReport {
            name: "straight_rate_a".to_string(),
            value: rate_a,
            expected: None,
            ci95: proportion_interval(rate_a, tally.sample_count, z),
            effective_sample_size: None,
        },
        EstimateReport {
            name: "straight_rate_b".to_string(),
            value: rate_b,
            expected: None,
            ci95: proportion_interval(rate_b, tally.sample_count, z),
            effective_sample_size: None,
        },
    ])
}

fn mean_interval(points: &[f64], z: f64) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = z * std_error;
    Some((mean - margin, mean + margin))
}

fn proportion_interval(p: f64, n: usize, z: f64) -> Option<(f64, f64)> {
    if n == 0 {
        return None;
    }
    let margin = z * (p * (1.0 - p) / n as f64).sqrt();
    Some(((p - margin).max(0.0), (p + margin).min(1.0)))
}
