use crate::types::*;
use std::collections::BTreeMap;

/// Mean and population standard deviation of a sample set
///
/// Population SD (divisor n) matches the historical analysis; do not
/// switch to the sample estimator without re-deriving the truncation
/// bounds downstream.
pub fn mean_sd(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Sorted unique team identifiers present in the record set
///
/// The position of a team in this list is its team index for the
/// seeding policy, so the ordering must be deterministic.
pub fn team_list(records: &[ShotRecord]) -> Vec<String> {
    let mut teams: Vec<String> = records.iter().map(|r| r.team.clone()).collect();
    teams.sort();
    teams.dedup();
    teams
}

fn matches_filters(record: &ShotRecord, team: Option<&str>, category: Option<PeriodCategory>) -> bool {
    if let Some(team) = team {
        if record.team != team {
            return false;
        }
    }
    if let Some(category) = category {
        if record.category != category {
            return false;
        }
    }
    true
}

/// Tally made/missed counts per zone for one team (or all teams)
///
/// Pure frequency reduction over the historical table. Fails with
/// `DegenerateZone` if either count in either zone is zero, since the
/// Beta success distribution built from the counts would be undefined.
pub fn shooting_profile(
    records: &[ShotRecord],
    team: Option<&str>,
    category: Option<PeriodCategory>,
) -> Result<ShootingProfile, SimError> {
    let label = team.unwrap_or("all teams").to_string();

    let mut counts = [[0u64; 2]; 2]; // [zone][outcome]
    let mut seen = false;
    for record in records {
        if !matches_filters(record, team, category) {
            continue;
        }
        seen = true;
        let zi = match record.zone {
            Zone::Inner => 0,
            Zone::Outer => 1,
        };
        let oi = match record.outcome {
            ShotOutcome::Made => 0,
            ShotOutcome::Missed => 1,
        };
        counts[zi][oi] += 1;
    }

    if !seen {
        return Err(SimError::EmptyTeamData(label));
    }

    let profile = ShootingProfile {
        team: label.clone(),
        inner: ZoneStatistics {
            team: label.clone(),
            zone: Zone::Inner,
            made: counts[0][0],
            missed: counts[0][1],
        },
        outer: ZoneStatistics {
            team: label,
            zone: Zone::Outer,
            made: counts[1][0],
            missed: counts[1][1],
        },
    };
    profile.validate()?;
    Ok(profile)
}

/// Shots one team attempted in each scoring period it played
///
/// One count per (match, period) cell, ordered deterministically by
/// match id then period. These are the volume history behind the
/// standard-sim shot sampler.
pub fn team_period_counts(
    records: &[ShotRecord],
    team: &str,
    category: Option<PeriodCategory>,
) -> Vec<u64> {
    let mut cells: BTreeMap<(String, u32), u64> = BTreeMap::new();
    for record in records {
        if !matches_filters(record, Some(team), category) {
            continue;
        }
        *cells.entry((record.match_id.clone(), record.period)).or_insert(0) += 1;
    }
    cells.into_values().collect()
}

/// Total shots by both teams in each scoring period of the season
pub fn total_period_counts(records: &[ShotRecord], category: Option<PeriodCategory>) -> Vec<u64> {
    let mut cells: BTreeMap<(String, u32), u64> = BTreeMap::new();
    for record in records {
        if !matches_filters(record, None, category) {
            continue;
        }
        *cells.entry((record.match_id.clone(), record.period)).or_insert(0) += 1;
    }
    cells.into_values().collect()
}

/// Historical share of each period's shots taken by one side
///
/// For every (match, period) cell, the proportion of shots attempted
/// by the lexicographically first team of that match. Feeds the
/// competitive volume split sampler.
pub fn share_samples(records: &[ShotRecord], category: Option<PeriodCategory>) -> Vec<f64> {
    // (match, period) -> team -> count
    let mut cells: BTreeMap<(String, u32), BTreeMap<String, u64>> = BTreeMap::new();
    for record in records {
        if !matches_filters(record, None, category) {
            continue;
        }
        *cells
            .entry((record.match_id.clone(), record.period))
            .or_default()
            .entry(record.team.clone())
            .or_insert(0) += 1;
    }

    let mut shares = Vec::new();
    for by_team in cells.values() {
        if by_team.len() != 2 {
            // A period where only one side attempted shots carries no
            // split information
            continue;
        }
        let counts: Vec<u64> = by_team.values().copied().collect();
        let total = counts[0] + counts[1];
        shares.push(counts[0] as f64 / total as f64);
    }
    shares
}
