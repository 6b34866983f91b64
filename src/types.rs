use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shooting zones under the Super Shot rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Standard shooting circle, 1 point per goal
    Inner,
    /// Super Shot zone, 2 points per goal
    Outer,
}

impl Zone {
    pub fn point_value(&self) -> u64 {
        match self {
            Zone::Inner => 1,
            Zone::Outer => 2,
        }
    }
}

/// Outcome of a single shot attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    Made,
    Missed,
}

/// Whether a period is an ordinary quarter or a Power 5 scoring period
/// (the segment during which the Super Shot rule is active)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodCategory {
    Ordinary,
    PowerFive,
}

/// A single historical shot event
///
/// Derived from provider match-event logs during ingestion; consumed
/// read-only by the statistics aggregator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShotRecord {
    pub team: String,
    pub match_id: String,
    pub round: u32,
    pub period: u32,
    pub category: PeriodCategory,
    pub zone: Zone,
    pub outcome: ShotOutcome,
    pub points: u64,
}

/// Made/missed tallies for one team in one zone
///
/// Both counts parameterize a Beta success-probability distribution, so
/// both must be at least 1 for the distribution to be well-defined.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneStatistics {
    pub team: String,
    pub zone: Zone,
    pub made: u64,
    pub missed: u64,
}

impl ZoneStatistics {
    pub fn attempts(&self) -> u64 {
        self.made + self.missed
    }

    /// Check that a Beta(made, missed) distribution is well-defined
    pub fn validate(&self) -> Result<(), SimError> {
        if self.made == 0 || self.missed == 0 {
            return Err(SimError::DegenerateZone {
                team: self.team.clone(),
                zone: self.zone,
                made: self.made,
                missed: self.missed,
            });
        }
        Ok(())
    }
}

/// A team's shot-success statistics in both zones
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShootingProfile {
    pub team: String,
    pub inner: ZoneStatistics,
    pub outer: ZoneStatistics,
}

impl ShootingProfile {
    pub fn validate(&self) -> Result<(), SimError> {
        self.inner.validate()?;
        self.outer.validate()
    }
}

/// A pluggable set of Super Shot tendency values with display labels
///
/// The tendency is a per-shot probability in [0, 1] of electing to
/// attempt a Super Shot; higher values lean further toward the outer
/// zone. Values and labels are parallel arrays.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrategySet {
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

impl StrategySet {
    /// The five-point set used in the published analysis
    pub fn five_point() -> Self {
        Self {
            values: vec![0.0, 0.25, 0.5, 0.75, 1.0],
            labels: ["Zero", "Low", "Moderate", "High", "AllOut"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Decile steps from 0.0 to 1.0 inclusive
    pub fn deciles() -> Self {
        let values: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        let labels = values.iter().map(|v| format!("{:.1}", v)).collect();
        Self { values, labels }
    }

    /// Build a set from bare values, labelling each with its value
    pub fn from_values(values: Vec<f64>) -> Self {
        let labels = values.iter().map(|v| format!("{:.2}", v)).collect();
        Self { values, labels }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate (value, label) pairs
    pub fn iter(&self) -> impl Iterator<Item = (f64, &str)> {
        self.values
            .iter()
            .copied()
            .zip(self.labels.iter().map(|s| s.as_str()))
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.values.is_empty() {
            return Err(SimError::EmptyStrategySet);
        }
        if self.values.len() != self.labels.len() {
            return Err(SimError::LengthMismatch {
                context: "strategy values vs labels",
                left: self.values.len(),
                right: self.labels.len(),
            });
        }
        for &value in &self.values {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(SimError::InvalidStrategy(value));
            }
        }
        Ok(())
    }
}

/// How competitive shot volumes are drawn each trial
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    /// Total period volume and the team share both drawn from
    /// truncated normals fit to the season, halves mirrored between
    /// the two sides so the split balances across the trial set
    Linked,
    /// Total fixed at the rounded league mean, split evenly; only
    /// strategy parameters vary between competitors
    Matched,
}

/// Simulation batch configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Trials per (team, strategy) or (pair, strategy pair) cell
    pub trials: usize,
    /// Base seed for the per-stream seeding policy
    pub base_seed: u64,
    /// Tendency values to sweep
    pub strategies: StrategySet,
    /// Competitive volume drawing mode
    pub volume_mode: VolumeMode,
    /// Restrict historical statistics to Power 5 periods
    pub power_five_only: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            base_seed: 12345,
            strategies: StrategySet::five_point(),
            volume_mode: VolumeMode::Linked,
            power_five_only: true,
        }
    }
}

impl SimulationConfig {
    /// Reject bad configuration before any trial runs
    pub fn validate(&self) -> Result<(), SimError> {
        if self.trials == 0 {
            return Err(SimError::NoTrials);
        }
        self.strategies.validate()
    }

    pub fn period_filter(&self) -> Option<PeriodCategory> {
        if self.power_five_only {
            Some(PeriodCategory::PowerFive)
        } else {
            None
        }
    }
}

/// One simulated scoring period for a single team at a fixed tendency
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardTrial {
    pub team: String,
    pub trial: usize,
    pub strategy: f64,
    pub strategy_label: String,
    pub shots: u64,
    pub standard_shots: u64,
    pub super_shots: u64,
    pub points: u64,
    /// Points relative to the same trial scored at tendency zero;
    /// `None` when the zero-tendency baseline scored nothing
    pub relative_points: Option<f64>,
    /// Decile bin of the realized Super Shot proportion; `None` for a
    /// zero-shot period
    pub super_bin: Option<usize>,
}

/// One simulated head-to-head scoring period
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompetitiveTrial {
    pub team_a: String,
    pub team_b: String,
    pub trial: usize,
    pub strategy_a: f64,
    pub strategy_b: f64,
    pub label_a: String,
    pub label_b: String,
    pub shots_a: u64,
    pub standard_a: u64,
    pub super_a: u64,
    pub points_a: u64,
    pub shots_b: u64,
    pub standard_b: u64,
    pub super_b: u64,
    pub points_b: u64,
    /// Team A points minus team B points
    pub margin: i64,
}

/// Win/loss and margin summary for one stratification cell
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub team: String,
    pub opponent: String,
    pub strategy: f64,
    pub opponent_strategy: f64,
    pub trials: usize,
    /// Fraction of trials with margin > 0
    pub win_proportion: f64,
    /// Fraction of trials with margin < 0
    pub loss_proportion: f64,
    /// Fraction of trials with margin == 0; ties count as neither win
    /// nor loss
    pub tie_proportion: f64,
    /// Margin mean/SD over the winning subset only
    pub win_margin_mean: Option<f64>,
    pub win_margin_sd: Option<f64>,
    /// Margin mean/SD over the losing subset only
    pub loss_margin_mean: Option<f64>,
    pub loss_margin_sd: Option<f64>,
    /// 90% empirical interval from the exact-rank ECDF
    pub margin_lower90: i64,
    pub margin_upper90: i64,
}

/// Mean/SD of points per (team, strategy) cell of a standard batch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardSummary {
    pub team: String,
    pub strategy: f64,
    pub strategy_label: String,
    pub trials: usize,
    pub points_mean: f64,
    pub points_sd: f64,
    /// Mean/SD of relative points, over trials with a defined baseline
    pub relative_mean: Option<f64>,
    pub relative_sd: Option<f64>,
}

/// Simulation error conditions
///
/// Configuration and data errors are raised before any trial executes;
/// a batch either completes fully or fails with one of these.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("degenerate shot statistics for {team} ({zone:?}): made={made}, missed={missed}; Beta distribution undefined")]
    DegenerateZone {
        team: String,
        zone: Zone,
        made: u64,
        missed: u64,
    },

    #[error("no shot records found for team {0}")]
    EmptyTeamData(String),

    #[error("empty team list")]
    NoTeams,

    #[error("strategy value {0} outside [0, 1]")]
    InvalidStrategy(f64),

    #[error("empty strategy set")]
    EmptyStrategySet,

    #[error("trial count must be at least 1")]
    NoTrials,

    #[error("need at least two historical period samples for {0}")]
    InsufficientHistory(String),

    #[error("array length mismatch in {context}: {left} vs {right}")]
    LengthMismatch {
        context: &'static str,
        left: usize,
        right: usize,
    },

    #[error("empirical quantile {quantile} has no exact rank among {n} samples")]
    QuantileRank { quantile: f64, n: usize },

    #[error("cannot summarize an empty trial set")]
    EmptyTrialSet,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
