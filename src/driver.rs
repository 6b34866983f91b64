use crate::aggregate::{proportion_bin, validate_interval_trials};
use crate::sampler::{LinkedVolumes, VolumeDistribution};
use crate::simulator::{score_trial, SeedPolicy, TrialDraws};
use crate::stats::{
    share_samples, shooting_profile, team_list, team_period_counts, total_period_counts,
};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// Per-team standard batch: every team scores alone at every tendency
///
/// All historical fitting and validation happens in `from_records`, so
/// a constructed simulation cannot fail on data problems mid-batch.
pub struct StandardSimulation {
    config: SimulationConfig,
    teams: Vec<String>,
    profiles: Vec<ShootingProfile>,
    volume_models: Vec<VolumeDistribution>,
    policy: SeedPolicy,
}

impl StandardSimulation {
    pub fn from_records(records: &[ShotRecord], config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let filter = config.period_filter();

        let teams = team_list(records);
        if teams.is_empty() {
            return Err(SimError::NoTeams);
        }

        let mut profiles = Vec::with_capacity(teams.len());
        let mut volume_models = Vec::with_capacity(teams.len());
        for team in &teams {
            profiles.push(shooting_profile(records, Some(team), filter)?);
            let counts = team_period_counts(records, team, filter);
            volume_models.push(VolumeDistribution::from_mean_interval(&counts, team)?);
        }

        let policy = SeedPolicy::new(config.base_seed);
        Ok(Self {
            config,
            teams,
            profiles,
            volume_models,
            policy,
        })
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Run the full batch: teams x trials x strategies
    ///
    /// Each trial's shot volume and random arrays are drawn ONCE and
    /// scored at every tendency, so strategies are compared on paired
    /// draws rather than independent ones. The tendency-zero score of
    /// the same trial is the baseline for `relative_points`.
    pub fn run(&self) -> Result<Vec<StandardTrial>, SimError> {
        let trials = self.config.trials;
        let mut rows = Vec::with_capacity(self.teams.len() * trials * self.config.strategies.len());

        for (team_index, team) in self.teams.iter().enumerate() {
            info!(team = %team, trials, "simulating standard scoring periods");

            let mut volume_rng = StdRng::seed_from_u64(self.policy.team_volume_seed(team_index));
            let volumes = self.volume_models[team_index].sample_counts(&mut volume_rng, trials);

            for trial in 0..trials {
                let draws = TrialDraws::sample(
                    &self.profiles[team_index],
                    volumes[trial],
                    team_index,
                    trial,
                    &self.policy,
                )?;
                let baseline = score_trial(&draws, 0.0)?;

                for (strategy, label) in self.config.strategies.iter() {
                    let outcome = score_trial(&draws, strategy)?;
                    let relative_points = if baseline.points > 0 {
                        Some(outcome.points as f64 / baseline.points as f64)
                    } else {
                        None
                    };
                    rows.push(StandardTrial {
                        team: team.clone(),
                        trial,
                        strategy,
                        strategy_label: label.to_string(),
                        shots: outcome.shots,
                        standard_shots: outcome.standard_shots,
                        super_shots: outcome.super_shots,
                        points: outcome.points,
                        relative_points,
                        super_bin: proportion_bin(outcome.super_shots, outcome.shots),
                    });
                }
            }
        }
        Ok(rows)
    }
}

/// Head-to-head batch: every unordered team pair at every ordered
/// strategy pairing
pub struct CompetitiveSimulation {
    config: SimulationConfig,
    teams: Vec<String>,
    profiles: Vec<ShootingProfile>,
    /// Total shots per period across both sides, fit to the season
    total_model: VolumeDistribution,
    /// One side's share of the period total, fit to the season
    share_model: VolumeDistribution,
    policy: SeedPolicy,
}

impl CompetitiveSimulation {
    pub fn from_records(records: &[ShotRecord], config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        // The margin summary needs exact 5%/95% ranks; reject a trial
        // count that cannot provide them before any trial runs
        validate_interval_trials(config.trials)?;
        let filter = config.period_filter();

        let teams = team_list(records);
        if teams.len() < 2 {
            return Err(SimError::NoTeams);
        }

        let mut profiles = Vec::with_capacity(teams.len());
        for team in &teams {
            profiles.push(shooting_profile(records, Some(team), filter)?);
        }

        let totals = total_period_counts(records, filter);
        let total_model = VolumeDistribution::from_observed_count_range(&totals, "period totals")?;
        let shares = share_samples(records, filter);
        let share_model = VolumeDistribution::from_observed_range(&shares, "period shares")?;

        let policy = SeedPolicy::new(config.base_seed);
        Ok(Self {
            config,
            teams,
            profiles,
            total_model,
            share_model,
            policy,
        })
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Run the full batch: pairs x strategies^2 x trials
    ///
    /// One set of linked volumes serves every pairing, and each side's
    /// per-trial draws are sampled once per pair and reused across all
    /// strategy pairings. A side's draws depend on its team index and
    /// the trial, never on the opponent or its own tendency.
    pub fn run(&self) -> Result<Vec<CompetitiveTrial>, SimError> {
        let trials = self.config.trials;

        let volumes = match self.config.volume_mode {
            VolumeMode::Linked => {
                let mut total_rng = StdRng::seed_from_u64(self.policy.linked_total_seed());
                let mut share_rng = StdRng::seed_from_u64(self.policy.linked_share_seed());
                LinkedVolumes::sample(
                    &self.total_model,
                    &self.share_model,
                    trials,
                    &mut total_rng,
                    &mut share_rng,
                )
            }
            VolumeMode::Matched => LinkedVolumes::matched(self.total_model.mean, trials),
        };

        let strategy_pairs = self.config.strategies.len() * self.config.strategies.len();
        let mut rows = Vec::new();

        for i in 0..self.teams.len() {
            for j in (i + 1)..self.teams.len() {
                info!(
                    team_a = %self.teams[i],
                    team_b = %self.teams[j],
                    trials,
                    "simulating head-to-head scoring periods"
                );

                let mut draws_a = Vec::with_capacity(trials);
                let mut draws_b = Vec::with_capacity(trials);
                for trial in 0..trials {
                    draws_a.push(TrialDraws::sample(
                        &self.profiles[i],
                        volumes.team_a[trial],
                        i,
                        trial,
                        &self.policy,
                    )?);
                    draws_b.push(TrialDraws::sample(
                        &self.profiles[j],
                        volumes.team_b[trial],
                        j,
                        trial,
                        &self.policy,
                    )?);
                }

                rows.reserve(strategy_pairs * trials);
                for (strategy_a, label_a) in self.config.strategies.iter() {
                    for (strategy_b, label_b) in self.config.strategies.iter() {
                        for trial in 0..trials {
                            let a = score_trial(&draws_a[trial], strategy_a)?;
                            let b = score_trial(&draws_b[trial], strategy_b)?;
                            rows.push(CompetitiveTrial {
                                team_a: self.teams[i].clone(),
                                team_b: self.teams[j].clone(),
                                trial,
                                strategy_a,
                                strategy_b,
                                label_a: label_a.to_string(),
                                label_b: label_b.to_string(),
                                shots_a: a.shots,
                                standard_a: a.standard_shots,
                                super_a: a.super_shots,
                                points_a: a.points,
                                shots_b: b.shots,
                                standard_b: b.standard_shots,
                                super_b: b.super_shots,
                                points_b: b.points,
                                margin: a.points as i64 - b.points as i64,
                            });
                        }
                    }
                }
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_shots(
        records: &mut Vec<ShotRecord>,
        team: &str,
        match_id: &str,
        period: u32,
        shots: &[(Zone, ShotOutcome)],
    ) {
        for &(zone, outcome) in shots {
            records.push(ShotRecord {
                team: team.to_string(),
                match_id: match_id.to_string(),
                round: 1,
                period,
                category: PeriodCategory::PowerFive,
                zone,
                outcome,
                points: match outcome {
                    ShotOutcome::Made => zone.point_value(),
                    ShotOutcome::Missed => 0,
                },
            });
        }
    }

    fn season_records() -> Vec<ShotRecord> {
        use ShotOutcome::{Made, Missed};
        use Zone::{Inner, Outer};
        let mut records = Vec::new();
        push_shots(
            &mut records,
            "Fever",
            "m1",
            2,
            &[
                (Inner, Made),
                (Inner, Made),
                (Inner, Made),
                (Inner, Missed),
                (Outer, Made),
                (Outer, Missed),
            ],
        );
        push_shots(
            &mut records,
            "Fever",
            "m1",
            4,
            &[
                (Inner, Made),
                (Inner, Made),
                (Inner, Missed),
                (Inner, Missed),
                (Outer, Made),
                (Outer, Missed),
                (Outer, Missed),
            ],
        );
        push_shots(
            &mut records,
            "Fever",
            "m2",
            2,
            &[
                (Inner, Made),
                (Inner, Made),
                (Inner, Made),
                (Inner, Made),
                (Inner, Missed),
            ],
        );
        push_shots(
            &mut records,
            "Fever",
            "m2",
            4,
            &[(Inner, Made), (Inner, Made), (Inner, Made), (Outer, Missed)],
        );
        push_shots(
            &mut records,
            "Swifts",
            "m1",
            2,
            &[
                (Inner, Made),
                (Inner, Made),
                (Inner, Missed),
                (Inner, Missed),
                (Outer, Made),
            ],
        );
        push_shots(
            &mut records,
            "Swifts",
            "m1",
            4,
            &[(Inner, Made), (Inner, Made), (Inner, Made), (Outer, Missed)],
        );
        push_shots(
            &mut records,
            "Swifts",
            "m2",
            2,
            &[
                (Inner, Made),
                (Inner, Made),
                (Inner, Missed),
                (Outer, Made),
                (Outer, Missed),
            ],
        );
        push_shots(
            &mut records,
            "Swifts",
            "m2",
            4,
            &[
                (Inner, Made),
                (Inner, Made),
                (Inner, Made),
                (Inner, Made),
                (Inner, Missed),
                (Inner, Missed),
            ],
        );
        records
    }

    fn small_config() -> SimulationConfig {
        // 40 trials keeps the 5%/95% interval ranks exact
        SimulationConfig {
            trials: 40,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_standard_batch_shape() {
        let records = season_records();
        let sim = StandardSimulation::from_records(&records, small_config()).unwrap();
        let rows = sim.run().unwrap();
        // 2 teams x 40 trials x 5 strategies
        assert_eq!(rows.len(), 2 * 40 * 5);
        assert_eq!(sim.teams(), &["Fever".to_string(), "Swifts".to_string()]);
    }

    #[test]
    fn test_standard_zero_tendency_is_its_own_baseline() {
        let records = season_records();
        let sim = StandardSimulation::from_records(&records, small_config()).unwrap();
        for row in sim.run().unwrap() {
            if row.strategy == 0.0 {
                match row.relative_points {
                    Some(r) => {
                        assert!(row.points > 0);
                        assert!((r - 1.0).abs() < 1e-12);
                    }
                    None => assert_eq!(row.points, 0),
                }
            }
        }
    }

    #[test]
    fn test_standard_strategies_share_trial_volume() {
        let records = season_records();
        let sim = StandardSimulation::from_records(&records, small_config()).unwrap();
        let rows = sim.run().unwrap();
        // Rows are grouped team -> trial -> strategy; within one trial
        // every strategy sees the same shot count
        for chunk in rows.chunks(5) {
            for row in chunk {
                assert_eq!(row.trial, chunk[0].trial);
                assert_eq!(row.shots, chunk[0].shots);
            }
        }
    }

    #[test]
    fn test_standard_tendency_extremes_pin_the_bin() {
        let records = season_records();
        let sim = StandardSimulation::from_records(&records, small_config()).unwrap();
        for row in sim.run().unwrap() {
            if row.shots == 0 {
                assert_eq!(row.super_bin, None);
            } else if row.strategy == 0.0 {
                assert_eq!(row.super_bin, Some(0));
            } else if row.strategy == 1.0 {
                assert_eq!(row.super_bin, Some(9));
            }
        }
    }

    #[test]
    fn test_standard_batch_is_reproducible() {
        let records = season_records();
        let sim = StandardSimulation::from_records(&records, small_config()).unwrap();
        let first: Vec<u64> = sim.run().unwrap().iter().map(|r| r.points).collect();
        let second: Vec<u64> = sim.run().unwrap().iter().map(|r| r.points).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_competitive_batch_shape() {
        let records = season_records();
        let sim = CompetitiveSimulation::from_records(&records, small_config()).unwrap();
        let rows = sim.run().unwrap();
        // 1 pair x 25 strategy pairings x 40 trials
        assert_eq!(rows.len(), 25 * 40);
        for row in &rows {
            assert_eq!(row.margin, row.points_a as i64 - row.points_b as i64);
        }
    }

    #[test]
    fn test_competitive_side_score_ignores_opponent_strategy() {
        let records = season_records();
        let sim = CompetitiveSimulation::from_records(&records, small_config()).unwrap();
        let rows = sim.run().unwrap();
        // Team A's draws and tendency fix its score; sweeping the
        // opponent's tendency must not change points_a for a trial
        let reference: Vec<u64> = rows
            .iter()
            .filter(|r| r.strategy_a == 0.5 && r.strategy_b == 0.0)
            .map(|r| r.points_a)
            .collect();
        for (sweep, reference_points) in rows
            .iter()
            .filter(|r| r.strategy_a == 0.5 && r.strategy_b == 1.0)
            .zip(&reference)
        {
            assert_eq!(sweep.points_a, *reference_points);
        }
    }

    #[test]
    fn test_matched_volumes_fix_the_period_total() {
        let records = season_records();
        let config = SimulationConfig {
            trials: 40,
            volume_mode: VolumeMode::Matched,
            ..SimulationConfig::default()
        };
        let sim = CompetitiveSimulation::from_records(&records, config).unwrap();
        let rows = sim.run().unwrap();
        let total = rows[0].shots_a + rows[0].shots_b;
        for row in &rows {
            assert_eq!(row.shots_a + row.shots_b, total);
            assert!(row.shots_a.abs_diff(row.shots_b) <= 1);
        }
    }

    #[test]
    fn test_competitive_rejects_trial_count_without_exact_interval_ranks() {
        // 0.05 * 30 = 1.5: the margin summary could never place its
        // interval endpoints, so the batch must not start at all
        let records = season_records();
        let config = SimulationConfig {
            trials: 30,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            CompetitiveSimulation::from_records(&records, config),
            Err(SimError::QuantileRank { .. })
        ));
    }

    #[test]
    fn test_competitive_needs_two_teams() {
        let records: Vec<ShotRecord> = season_records()
            .into_iter()
            .filter(|r| r.team == "Fever")
            .collect();
        assert!(matches!(
            CompetitiveSimulation::from_records(&records, small_config()),
            Err(SimError::NoTeams)
        ));
    }

    #[test]
    fn test_bad_config_rejected_up_front() {
        let records = season_records();
        let config = SimulationConfig {
            strategies: StrategySet::from_values(vec![0.5, 2.0]),
            ..small_config()
        };
        assert!(StandardSimulation::from_records(&records, config).is_err());
    }
}
