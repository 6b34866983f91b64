//! Monte Carlo simulation of netball Super Shot scoring strategies.
//!
//! The pipeline: historical shot records feed per-team shooting
//! profiles and volume distributions; trials draw shot volumes and
//! per-shot randomness once, then score them at each Super Shot
//! tendency; aggregation reduces trials to win/loss and margin
//! summaries. Every random stream is seeded per (team, trial), so
//! batches are reproducible and strategy comparisons are paired.

pub mod aggregate;
pub mod driver;
pub mod export;
pub mod sampler;
pub mod simulator;
pub mod stats;
pub mod types;

pub use aggregate::{
    bin_bounds, competitive_histograms, empirical_interval90, margin_histogram, margins_for_team,
    proportion_bin, standard_bin_occupancy, summarize_competitive, summarize_standard,
    validate_interval_trials, DecileBinRow, MarginBin, MarginHistogramRow,
};
pub use driver::{CompetitiveSimulation, StandardSimulation};
pub use sampler::{LinkedVolumes, VolumeDistribution};
pub use simulator::{score_trial, SeedPolicy, TrialDraws};
pub use types::{
    AggregateSummary, CompetitiveTrial, PeriodCategory, ShootingProfile, ShotOutcome, ShotRecord,
    SimError, SimulationConfig, StandardSummary, StandardTrial, StrategySet, VolumeMode, Zone,
    ZoneStatistics,
};
