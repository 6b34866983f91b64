use crate::sampler::uniform_draws;
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

// Stream constants keep every random stream of the batch disjoint.
const STREAM_TEAM_VOLUME: u64 = 12_345;
const STREAM_LINKED_TOTAL: u64 = 13_579;
const STREAM_LINKED_SHARE: u64 = 24_681;
const STREAM_TENDENCY: u64 = 54_321;
const STREAM_INNER_SUCCESS: u64 = 999;
const STREAM_OUTER_SUCCESS: u64 = 111;
const STREAM_COMPARATOR: u64 = 10_101;

/// Deterministic seed derivation for every random stream in a batch
///
/// Each stream seed depends only on (stream, team index, trial index),
/// never on the strategy value or the opponent. Consequences:
/// - results are bit-reproducible across runs with the same base seed;
/// - every strategy value is scored against the SAME per-trial draws,
///   so strategy comparisons are paired rather than independent;
/// - a team's draws are identical regardless of which side of a
///   competitive pairing it sits on, which makes swapped-role margins
///   negate exactly.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SeedPolicy {
    pub base: u64,
}

impl SeedPolicy {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    fn derive(&self, stream: u64, team_index: usize, trial: usize) -> u64 {
        self.base
            .wrapping_add(stream.wrapping_mul(trial as u64 + 1))
            .wrapping_add((team_index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    /// Per-team volume stream (one draw per trial, drawn up front)
    pub fn team_volume_seed(&self, team_index: usize) -> u64 {
        self.derive(STREAM_TEAM_VOLUME, team_index, 0)
    }

    /// League-wide total volume stream for competitive sims
    pub fn linked_total_seed(&self) -> u64 {
        self.derive(STREAM_LINKED_TOTAL, 0, 0)
    }

    /// Team share stream for competitive sims
    pub fn linked_share_seed(&self) -> u64 {
        self.derive(STREAM_LINKED_SHARE, 0, 0)
    }

    pub fn tendency_seed(&self, team_index: usize, trial: usize) -> u64 {
        self.derive(STREAM_TENDENCY, team_index, trial)
    }

    pub fn inner_success_seed(&self, team_index: usize, trial: usize) -> u64 {
        self.derive(STREAM_INNER_SUCCESS, team_index, trial)
    }

    pub fn outer_success_seed(&self, team_index: usize, trial: usize) -> u64 {
        self.derive(STREAM_OUTER_SUCCESS, team_index, trial)
    }

    pub fn comparator_seed(&self, team_index: usize, trial: usize) -> u64 {
        self.derive(STREAM_COMPARATOR, team_index, trial)
    }
}

/// The four random arrays behind one (team, trial) scoring period
///
/// Drawn once per trial and reused across every strategy value, so the
/// only thing that changes between strategies is the per-shot zone
/// election. All four arrays have one entry per shot.
#[derive(Clone, Debug)]
pub struct TrialDraws {
    /// Uniform [0,1) values the tendency is compared against
    pub tendency: Vec<f64>,
    /// Beta-sampled success probability per shot from the inner zone
    pub inner_success: Vec<f64>,
    /// Beta-sampled success probability per shot from the outer zone
    pub outer_success: Vec<f64>,
    /// Uniform [0,1) values deciding success against the probability
    pub comparator: Vec<f64>,
}

impl TrialDraws {
    /// Sample the trial's arrays for a given shot volume
    ///
    /// The success probabilities are drawn per SHOT, not per zone: the
    /// second randomness stage models shot-to-shot variation in
    /// conversion likelihood on top of the outcome comparator. A
    /// zero-shot volume produces empty arrays and skips all sampling.
    pub fn sample(
        profile: &ShootingProfile,
        shots: u64,
        team_index: usize,
        trial: usize,
        policy: &SeedPolicy,
    ) -> Result<Self, SimError> {
        profile.validate()?;
        let k = shots as usize;
        if k == 0 {
            return Ok(Self {
                tendency: Vec::new(),
                inner_success: Vec::new(),
                outer_success: Vec::new(),
                comparator: Vec::new(),
            });
        }

        let tendency = {
            let mut rng = StdRng::seed_from_u64(policy.tendency_seed(team_index, trial));
            uniform_draws(&mut rng, k)
        };
        let inner_success = beta_draws(
            &profile.inner,
            k,
            policy.inner_success_seed(team_index, trial),
        )?;
        let outer_success = beta_draws(
            &profile.outer,
            k,
            policy.outer_success_seed(team_index, trial),
        )?;
        let comparator = {
            let mut rng = StdRng::seed_from_u64(policy.comparator_seed(team_index, trial));
            uniform_draws(&mut rng, k)
        };

        Ok(Self {
            tendency,
            inner_success,
            outer_success,
            comparator,
        })
    }

    pub fn shots(&self) -> usize {
        self.tendency.len()
    }

    /// All four arrays must agree on the shot count
    fn check_lengths(&self) -> Result<usize, SimError> {
        let k = self.tendency.len();
        if self.inner_success.len() != k {
            return Err(SimError::LengthMismatch {
                context: "tendency vs inner success draws",
                left: k,
                right: self.inner_success.len(),
            });
        }
        if self.outer_success.len() != k {
            return Err(SimError::LengthMismatch {
                context: "tendency vs outer success draws",
                left: k,
                right: self.outer_success.len(),
            });
        }
        if self.comparator.len() != k {
            return Err(SimError::LengthMismatch {
                context: "tendency vs comparator draws",
                left: k,
                right: self.comparator.len(),
            });
        }
        Ok(k)
    }
}

fn beta_draws(stats: &ZoneStatistics, k: usize, seed: u64) -> Result<Vec<f64>, SimError> {
    let beta = Beta::new(stats.made as f64, stats.missed as f64).map_err(|_| {
        SimError::DegenerateZone {
            team: stats.team.clone(),
            zone: stats.zone,
            made: stats.made,
            missed: stats.missed,
        }
    })?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..k).map(|_| beta.sample(&mut rng)).collect())
}

/// One shot of a scored trial
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShotResult {
    pub zone: Zone,
    pub made: bool,
}

/// A scored scoring period for one side
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SideOutcome {
    pub shots: u64,
    pub standard_shots: u64,
    pub super_shots: u64,
    pub points: u64,
    pub shot_results: Vec<ShotResult>,
}

/// Score one side's trial draws at a given Super Shot tendency
///
/// Shot i is elected as a Super Shot iff tendency > tendency[i]; it
/// scores iff comparator[i] < the elected zone's success probability.
/// Role-agnostic: the competitive driver calls this once per side.
pub fn score_trial(draws: &TrialDraws, tendency: f64) -> Result<SideOutcome, SimError> {
    if !(0.0..=1.0).contains(&tendency) || tendency.is_nan() {
        return Err(SimError::InvalidStrategy(tendency));
    }
    let k = draws.check_lengths()?;

    let mut shot_results = Vec::with_capacity(k);
    let mut super_shots = 0u64;
    let mut points = 0u64;

    for i in 0..k {
        let take_super = tendency > draws.tendency[i];
        let zone = if take_super { Zone::Outer } else { Zone::Inner };
        let success_prob = if take_super {
            draws.outer_success[i]
        } else {
            draws.inner_success[i]
        };
        let made = draws.comparator[i] < success_prob;

        if take_super {
            super_shots += 1;
        }
        if made {
            points += zone.point_value();
        }
        shot_results.push(ShotResult { zone, made });
    }

    Ok(SideOutcome {
        shots: k as u64,
        standard_shots: k as u64 - super_shots,
        super_shots,
        points,
        shot_results,
    })
}
