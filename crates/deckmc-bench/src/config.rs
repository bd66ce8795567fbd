use deckmc_core::sampling::PmfConvention;
use deckmc_core::weighting::MixingWeights;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

const DEFAULT_RECENT_CAPACITY: usize = 20;
const DEFAULT_RECENT_DISPLAY: usize = 10;
/// Largest accepted sample ceiling; every batch recomputes over the full prefix.
pub const MAX_SAMPLE_LIMIT: usize = 1_000_000;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root driver configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchConfig {
    pub run_id: String,
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub recent: RecentConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.scenario.validate()?;
        self.recent.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            history_jsonl: resolve_template(&self.run_id, &self.outputs.history_jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ScenarioKind {
    Uniform,
    FaceBiased,
    WeightedConvergence,
    MisConvergence,
    PokerStraight,
    WeightedWalkthrough,
    MisWalkthrough,
}

impl ScenarioKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::Uniform => "uniform",
            ScenarioKind::FaceBiased => "face_biased",
            ScenarioKind::WeightedConvergence => "weighted_convergence",
            ScenarioKind::MisConvergence => "mis_convergence",
            ScenarioKind::PokerStraight => "poker_straight",
            ScenarioKind::WeightedWalkthrough => "weighted_walkthrough",
            ScenarioKind::MisWalkthrough => "mis_walkthrough",
        }
    }

    pub const fn is_walkthrough(self) -> bool {
        matches!(
            self,
            ScenarioKind::WeightedWalkthrough | ScenarioKind::MisWalkthrough
        )
    }

    /// Samples drawn per tick. Walkthroughs ignore it and draw their whole sequence at once.
    pub const fn default_batch_size(self) -> usize {
        match self {
            ScenarioKind::Uniform => 100,
            ScenarioKind::FaceBiased
            | ScenarioKind::WeightedConvergence
            | ScenarioKind::MisConvergence => 30,
            ScenarioKind::PokerStraight => 20,
            ScenarioKind::WeightedWalkthrough | ScenarioKind::MisWalkthrough => {
                deckmc_core::estimator::WALKTHROUGH_SAMPLES
            }
        }
    }

    /// Sample-count ceiling after which the driver stops.
    pub const fn default_sample_limit(self) -> usize {
        match self {
            ScenarioKind::Uniform | ScenarioKind::PokerStraight => 10_000,
            ScenarioKind::FaceBiased
            | ScenarioKind::WeightedConvergence
            | ScenarioKind::MisConvergence => 5_000,
            ScenarioKind::WeightedWalkthrough | ScenarioKind::MisWalkthrough => {
                deckmc_core::estimator::WALKTHROUGH_SAMPLES
            }
        }
    }

    pub const fn default_tick_interval_ms(self) -> u64 {
        match self {
            ScenarioKind::PokerStraight => 100,
            _ => 50,
        }
    }
}

/// Scenario selection and sampling parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub kind: ScenarioKind,
    pub seed: Option<u64>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub sample_limit: Option<usize>,
    /// Sleep between batches. Unset runs flat out unless `paced` is true.
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,
    #[serde(default)]
    pub paced: bool,
    #[serde(default)]
    pub pmf_convention: PmfConvention,
    #[serde(default)]
    pub mixing: MixingWeights,
}

impl ScenarioConfig {
    pub fn batch_size(&self) -> usize {
        self.batch_size
            .unwrap_or_else(|| self.kind.default_batch_size())
    }

    pub fn sample_limit(&self) -> usize {
        self.sample_limit
            .unwrap_or_else(|| self.kind.default_sample_limit())
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        match (self.tick_interval_ms, self.paced) {
            (Some(0), _) => None,
            (Some(ms), _) => Some(Duration::from_millis(ms)),
            (None, true) => Some(Duration::from_millis(self.kind.default_tick_interval_ms())),
            (None, false) => None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size() == 0 {
            return Err(ValidationError::InvalidField {
                field: "scenario.batch_size".to_string(),
                message: "batch size must be greater than zero".to_string(),
            });
        }

        if self.sample_limit() == 0 {
            return Err(ValidationError::InvalidField {
                field: "scenario.sample_limit".to_string(),
                message: "sample limit must be greater than zero".to_string(),
            });
        }

        if self.sample_limit() > MAX_SAMPLE_LIMIT {
            return Err(ValidationError::InvalidField {
                field: "scenario.sample_limit".to_string(),
                message: format!(
                    "sample limit {} exceeds the maximum of {MAX_SAMPLE_LIMIT}",
                    self.sample_limit()
                ),
            });
        }

        Ok(())
    }
}

/// Ring buffer sizes for the recent-sample feed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RecentConfig {
    #[serde(default = "default_recent_capacity")]
    pub capacity: usize,
    #[serde(default = "default_recent_display")]
    pub display: usize,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_RECENT_CAPACITY,
            display: DEFAULT_RECENT_DISPLAY,
        }
    }
}

impl RecentConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.capacity == 0 {
            return Err(ValidationError::InvalidField {
                field: "recent.capacity".to_string(),
                message: "capacity must be at least 1".to_string(),
            });
        }

        if self.display > self.capacity {
            return Err(ValidationError::InvalidField {
                field: "recent.display".to_string(),
                message: format!(
                    "cannot display {} samples from a buffer of {}",
                    self.display, self.capacity
                ),
            });
        }

        Ok(())
    }
}

fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}

fn default_recent_display() -> usize {
    DEFAULT_RECENT_DISPLAY
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub history_jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.history_jsonl", &self.history_jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Emit one event per drawn sample in addition to per-batch events.
    #[serde(default)]
    pub sample_details: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            sample_details: false,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub history_jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary; telemetry lands next to it.
    pub fn run_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
