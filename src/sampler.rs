use crate::stats::mean_sd;
use crate::types::SimError;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// A normal distribution truncated to an explicit support interval
///
/// Per-team standard sims truncate to the 95% confidence interval of
/// the MEAN (mu +/- 1.96*sd/sqrt(n)), not to the observed data range.
/// This reproduces the historical analysis as published; it keeps the
/// sampling envelope tight around the mean and understates
/// trial-to-trial volume variance, and for teams with few observed
/// periods the lower bound can fall below zero. Kept as-is for
/// comparability with prior results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumeDistribution {
    pub mean: f64,
    pub sd: f64,
    pub lower: f64,
    pub upper: f64,
}

impl VolumeDistribution {
    /// Fit to per-period counts, truncating at the 95% CI of the mean
    pub fn from_mean_interval(samples: &[u64], label: &str) -> Result<Self, SimError> {
        let values = as_f64(samples);
        let (mean, sd) = mean_sd(&values);
        if samples.len() < 2 || sd == 0.0 {
            return Err(SimError::InsufficientHistory(label.to_string()));
        }
        let half_width = 1.96 * sd / (samples.len() as f64).sqrt();
        Ok(Self {
            mean,
            sd,
            lower: mean - half_width,
            upper: mean + half_width,
        })
    }

    /// Fit to samples, truncating at the observed data range
    pub fn from_observed_range(samples: &[f64], label: &str) -> Result<Self, SimError> {
        let (mean, sd) = mean_sd(samples);
        if samples.len() < 2 || sd == 0.0 {
            return Err(SimError::InsufficientHistory(label.to_string()));
        }
        let lower = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { mean, sd, lower, upper })
    }

    /// Fit to integer counts, truncating at the observed range
    pub fn from_observed_count_range(samples: &[u64], label: &str) -> Result<Self, SimError> {
        Self::from_observed_range(&as_f64(samples), label)
    }

    /// Draw one value by rejection against the truncation bounds
    pub fn sample(&self, rng: &mut StdRng) -> f64 {
        // Bounds sit within ~2 SD of the mean in both fitting modes,
        // so rejection terminates quickly
        let normal = Normal::new(self.mean, self.sd)
            .expect("finite mean and positive sd enforced at construction");
        loop {
            let value = normal.sample(rng);
            if value >= self.lower && value <= self.upper {
                return value;
            }
        }
    }

    /// Draw one shot count: sample, round to nearest, clamp at zero
    ///
    /// The CI-of-the-mean truncation can push the lower bound below
    /// zero for small teams; a draw that rounds negative becomes a
    /// zero-shot period rather than aborting the batch.
    pub fn sample_count(&self, rng: &mut StdRng) -> u64 {
        let value = self.sample(rng).round();
        if value < 0.0 {
            0
        } else {
            value as u64
        }
    }

    /// Draw a full batch of per-trial shot counts
    pub fn sample_counts(&self, rng: &mut StdRng, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.sample_count(rng)).collect()
    }
}

fn as_f64(samples: &[u64]) -> Vec<f64> {
    samples.iter().map(|&v| v as f64).collect()
}

/// Paired per-trial shot volumes for a competitive simulation
///
/// `team_a[t]` and `team_b[t]` always sum to the trial's total volume.
#[derive(Clone, Debug)]
pub struct LinkedVolumes {
    pub team_a: Vec<u64>,
    pub team_b: Vec<u64>,
}

impl LinkedVolumes {
    /// Draw linked volumes from total-volume and share distributions
    ///
    /// Half the trials are drawn as (total, share) pairs; the second
    /// half replays the same pairs with the sides swapped, so any
    /// volume advantage balances exactly across the trial set. An odd
    /// trial count keeps one unmirrored pair.
    pub fn sample(
        total: &VolumeDistribution,
        share: &VolumeDistribution,
        trials: usize,
        total_rng: &mut StdRng,
        share_rng: &mut StdRng,
    ) -> Self {
        let half = (trials + 1) / 2;
        let totals: Vec<u64> = (0..half).map(|_| total.sample_count(total_rng)).collect();
        let shares: Vec<f64> = (0..half)
            .map(|_| share.sample(share_rng).clamp(0.0, 1.0))
            .collect();

        let first: Vec<u64> = totals
            .iter()
            .zip(&shares)
            .map(|(&t, &p)| ((t as f64 * p).round() as u64).min(t))
            .collect();
        let second: Vec<u64> = totals.iter().zip(&first).map(|(&t, &a)| t - a).collect();

        let mut team_a = first.clone();
        team_a.extend_from_slice(&second);
        team_a.truncate(trials);

        let mut team_b = second;
        team_b.extend_from_slice(&first);
        team_b.truncate(trials);

        Self { team_a, team_b }
    }

    /// Fixed, even split of the rounded league-average total
    ///
    /// Removes volume variance entirely so that only the strategy
    /// parameters differ between competitors.
    pub fn matched(league_mean: f64, trials: usize) -> Self {
        let total = league_mean.round().max(0.0) as u64;
        let a = total / 2;
        let b = total - a;
        Self {
            team_a: vec![a; trials],
            team_b: vec![b; trials],
        }
    }

    pub fn len(&self) -> usize {
        self.team_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.team_a.is_empty()
    }
}

/// Uniform [0, 1) draws, one per shot
pub fn uniform_draws(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen::<f64>()).collect()
}
