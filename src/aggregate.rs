use crate::stats::mean_sd;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy values keyed for deterministic grouping
///
/// Tendencies are multiples of 0.01 in practice; scaling by 1000 gives
/// an exact integer key and a stable output order.
fn strategy_key(value: f64) -> i64 {
    (value * 1000.0).round() as i64
}

/// Empirical quantile by exact rank
///
/// The quantile must land exactly on a sample rank (q * n integral).
/// No interpolation: interval endpoints are always observed margins.
fn exact_rank_quantile(sorted: &[i64], quantile: f64) -> Result<i64, SimError> {
    let n = sorted.len();
    if n == 0 {
        return Err(SimError::EmptyTrialSet);
    }
    let position = quantile * n as f64;
    let rank = position.round();
    if (position - rank).abs() > 1e-9 || rank < 1.0 {
        return Err(SimError::QuantileRank { quantile, n });
    }
    Ok(sorted[rank as usize - 1])
}

/// Check that a trial count puts both 90% interval endpoints on exact
/// sample ranks
///
/// Rank integrality is a pure function of the trial count, so drivers
/// call this before running a batch whose summary would need the
/// interval; 30 trials would otherwise abort only at aggregation time.
pub fn validate_interval_trials(n: usize) -> Result<(), SimError> {
    for quantile in [0.05, 0.95] {
        let position = quantile * n as f64;
        let rank = position.round();
        if n == 0 || (position - rank).abs() > 1e-9 || rank < 1.0 {
            return Err(SimError::QuantileRank { quantile, n });
        }
    }
    Ok(())
}

/// 90% empirical interval over a margin sample (ranks at 5% and 95%)
pub fn empirical_interval90(margins: &[i64]) -> Result<(i64, i64), SimError> {
    let mut sorted = margins.to_vec();
    sorted.sort_unstable();
    let lower = exact_rank_quantile(&sorted, 0.05)?;
    let upper = exact_rank_quantile(&sorted, 0.95)?;
    Ok((lower, upper))
}

/// Margins from `team`'s perspective: negated wherever it played side B
pub fn margins_for_team(rows: &[CompetitiveTrial], team: &str) -> Vec<i64> {
    rows.iter()
        .filter_map(|r| {
            if r.team_a == team {
                Some(r.margin)
            } else if r.team_b == team {
                Some(-r.margin)
            } else {
                None
            }
        })
        .collect()
}

/// Summarize the margins of one stratification cell
fn summarize_margins(
    team: &str,
    opponent: &str,
    strategy: f64,
    opponent_strategy: f64,
    margins: &[i64],
) -> Result<AggregateSummary, SimError> {
    if margins.is_empty() {
        return Err(SimError::EmptyTrialSet);
    }
    let n = margins.len();

    let wins: Vec<f64> = margins.iter().filter(|&&m| m > 0).map(|&m| m as f64).collect();
    let losses: Vec<f64> = margins.iter().filter(|&&m| m < 0).map(|&m| m as f64).collect();
    let ties = n - wins.len() - losses.len();

    let (win_margin_mean, win_margin_sd) = if wins.is_empty() {
        (None, None)
    } else {
        let (mean, sd) = mean_sd(&wins);
        (Some(mean), Some(sd))
    };
    let (loss_margin_mean, loss_margin_sd) = if losses.is_empty() {
        (None, None)
    } else {
        let (mean, sd) = mean_sd(&losses);
        (Some(mean), Some(sd))
    };

    let (margin_lower90, margin_upper90) = empirical_interval90(margins)?;

    Ok(AggregateSummary {
        team: team.to_string(),
        opponent: opponent.to_string(),
        strategy,
        opponent_strategy,
        trials: n,
        win_proportion: wins.len() as f64 / n as f64,
        loss_proportion: losses.len() as f64 / n as f64,
        tie_proportion: ties as f64 / n as f64,
        win_margin_mean,
        win_margin_sd,
        loss_margin_mean,
        loss_margin_sd,
        margin_lower90,
        margin_upper90,
    })
}

/// Summarize a competitive batch per (pair, strategy pairing) cell,
/// from team A's perspective
pub fn summarize_competitive(rows: &[CompetitiveTrial]) -> Result<Vec<AggregateSummary>, SimError> {
    if rows.is_empty() {
        return Err(SimError::EmptyTrialSet);
    }

    let mut cells: BTreeMap<(String, String, i64, i64), Vec<i64>> = BTreeMap::new();
    for row in rows {
        cells
            .entry((
                row.team_a.clone(),
                row.team_b.clone(),
                strategy_key(row.strategy_a),
                strategy_key(row.strategy_b),
            ))
            .or_default()
            .push(row.margin);
    }

    let mut summaries = Vec::with_capacity(cells.len());
    for ((team, opponent, key_a, key_b), margins) in &cells {
        summaries.push(summarize_margins(
            team,
            opponent,
            *key_a as f64 / 1000.0,
            *key_b as f64 / 1000.0,
            margins,
        )?);
    }
    Ok(summaries)
}

/// Summarize a standard batch per (team, strategy) cell
pub fn summarize_standard(rows: &[StandardTrial]) -> Result<Vec<StandardSummary>, SimError> {
    if rows.is_empty() {
        return Err(SimError::EmptyTrialSet);
    }

    let mut cells: BTreeMap<(String, i64), (String, Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for row in rows {
        let cell = cells
            .entry((row.team.clone(), strategy_key(row.strategy)))
            .or_insert_with(|| (row.strategy_label.clone(), Vec::new(), Vec::new()));
        cell.1.push(row.points as f64);
        if let Some(relative) = row.relative_points {
            cell.2.push(relative);
        }
    }

    let mut summaries = Vec::with_capacity(cells.len());
    for ((team, key), (label, points, relatives)) in &cells {
        let (points_mean, points_sd) = mean_sd(points);
        let (relative_mean, relative_sd) = if relatives.is_empty() {
            (None, None)
        } else {
            let (mean, sd) = mean_sd(relatives);
            (Some(mean), Some(sd))
        };
        summaries.push(StandardSummary {
            team: team.clone(),
            strategy: *key as f64 / 1000.0,
            strategy_label: label.clone(),
            trials: points.len(),
            points_mean,
            points_sd,
            relative_mean,
            relative_sd,
        });
    }
    Ok(summaries)
}

/// Classify an observed Super Shot proportion into a decile bin
///
/// Bin 0 covers [0, 10%]; bin n covers (n*10%, (n+1)*10%]. Boundary
/// proportions fall in the LOWER bin, so a team shooting exactly 20%
/// Super Shots lands in bin 1. Returns `None` for a zero-shot period.
pub fn proportion_bin(super_shots: u64, total_shots: u64) -> Option<usize> {
    if total_shots == 0 {
        return None;
    }
    let proportion = super_shots as f64 / total_shots as f64;
    // Descending comparison avoids the float ladder of repeated
    // subtraction at the bin edges
    for bin in (1..10).rev() {
        if proportion > bin as f64 * 0.1 {
            return Some(bin);
        }
    }
    Some(0)
}

/// Tendency bounds of a decile bin, matching `proportion_bin`
pub fn bin_bounds(bin: usize) -> (f64, f64) {
    (bin as f64 * 0.1, (bin + 1) as f64 * 0.1)
}

/// One bar of a margin histogram: [lower, lower + width)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginBin {
    pub lower: i64,
    pub count: usize,
}

/// Histogram of margins in 1-point bins
///
/// When both sides shoot at full tendency every goal is worth 2, so
/// only even margins occur and the bin width doubles to keep every bar
/// non-empty in expectation.
pub fn margin_histogram(margins: &[i64], both_all_out: bool) -> Vec<MarginBin> {
    if margins.is_empty() {
        return Vec::new();
    }
    let width: i64 = if both_all_out { 2 } else { 1 };
    let min = *margins.iter().min().unwrap();
    let max = *margins.iter().max().unwrap();

    let mut bins = Vec::new();
    let mut lower = min;
    while lower <= max {
        let count = margins
            .iter()
            .filter(|&&m| m >= lower && m < lower + width)
            .count();
        bins.push(MarginBin { lower, count });
        lower += width;
    }
    bins
}

/// One histogram bar of one (pair, strategy pairing) cell, flattened
/// for tabular export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarginHistogramRow {
    pub team: String,
    pub opponent: String,
    pub strategy: f64,
    pub opponent_strategy: f64,
    pub lower: i64,
    pub width: i64,
    pub count: usize,
}

/// Margin histograms for every cell of a competitive batch
pub fn competitive_histograms(
    rows: &[CompetitiveTrial],
) -> Result<Vec<MarginHistogramRow>, SimError> {
    if rows.is_empty() {
        return Err(SimError::EmptyTrialSet);
    }

    let mut cells: BTreeMap<(String, String, i64, i64), Vec<i64>> = BTreeMap::new();
    for row in rows {
        cells
            .entry((
                row.team_a.clone(),
                row.team_b.clone(),
                strategy_key(row.strategy_a),
                strategy_key(row.strategy_b),
            ))
            .or_default()
            .push(row.margin);
    }

    let mut out = Vec::new();
    for ((team, opponent, key_a, key_b), margins) in &cells {
        let both_all_out = *key_a == 1000 && *key_b == 1000;
        let width: i64 = if both_all_out { 2 } else { 1 };
        for bin in margin_histogram(margins, both_all_out) {
            out.push(MarginHistogramRow {
                team: team.clone(),
                opponent: opponent.clone(),
                strategy: *key_a as f64 / 1000.0,
                opponent_strategy: *key_b as f64 / 1000.0,
                lower: bin.lower,
                width,
                count: bin.count,
            });
        }
    }
    Ok(out)
}

/// Decile bin occupancy of one (team, strategy) cell, with the bin's
/// tendency bounds, flattened for tabular export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecileBinRow {
    pub team: String,
    pub strategy: f64,
    pub bin: usize,
    pub lower: f64,
    pub upper: f64,
    pub trials: usize,
}

/// Count how many standard trials landed in each decile bin
///
/// Zero-shot trials carry no bin and are left out of the table; only
/// occupied bins produce rows.
pub fn standard_bin_occupancy(rows: &[StandardTrial]) -> Result<Vec<DecileBinRow>, SimError> {
    if rows.is_empty() {
        return Err(SimError::EmptyTrialSet);
    }

    let mut cells: BTreeMap<(String, i64, usize), usize> = BTreeMap::new();
    for row in rows {
        if let Some(bin) = row.super_bin {
            *cells
                .entry((row.team.clone(), strategy_key(row.strategy), bin))
                .or_insert(0) += 1;
        }
    }

    let mut out = Vec::with_capacity(cells.len());
    for ((team, key, bin), trials) in &cells {
        let (lower, upper) = bin_bounds(*bin);
        out.push(DecileBinRow {
            team: team.clone(),
            strategy: *key as f64 / 1000.0,
            bin: *bin,
            lower,
            upper,
            trials: *trials,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_with_margin(margin: i64) -> CompetitiveTrial {
        CompetitiveTrial {
            team_a: "Fever".to_string(),
            team_b: "Swifts".to_string(),
            trial: 0,
            strategy_a: 0.5,
            strategy_b: 0.25,
            label_a: "Moderate".to_string(),
            label_b: "Low".to_string(),
            shots_a: 10,
            standard_a: 5,
            super_a: 5,
            points_a: (12 + margin.max(0)) as u64,
            shots_b: 10,
            standard_b: 7,
            super_b: 3,
            points_b: (12 - margin.min(0)) as u64,
            margin,
        }
    }

    fn margin_batch(margins: &[i64]) -> Vec<CompetitiveTrial> {
        margins.iter().map(|&m| trial_with_margin(m)).collect()
    }

    #[test]
    fn test_win_loss_tie_proportions() {
        // 550 wins, 400 losses, 50 ties out of 1000
        let mut margins = vec![3i64; 550];
        margins.extend(vec![-2i64; 400]);
        margins.extend(vec![0i64; 50]);
        let rows = margin_batch(&margins);
        let summaries = summarize_competitive(&rows).unwrap();
        assert_eq!(summaries.len(), 1);
        let cell = &summaries[0];
        assert!((cell.win_proportion - 0.55).abs() < 1e-12);
        assert!((cell.loss_proportion - 0.40).abs() < 1e-12);
        assert!((cell.tie_proportion - 0.05).abs() < 1e-12);
        assert!(
            (cell.win_proportion + cell.loss_proportion + cell.tie_proportion - 1.0).abs() < 1e-12
        );
        // Conditional subsets, not whole-sample statistics
        assert_eq!(cell.win_margin_mean, Some(3.0));
        assert_eq!(cell.loss_margin_mean, Some(-2.0));
        assert_eq!(cell.win_margin_sd, Some(0.0));
    }

    #[test]
    fn test_one_sided_cell_has_no_loss_statistics() {
        let margins = vec![5i64; 1000];
        let summaries = summarize_competitive(&margin_batch(&margins)).unwrap();
        let cell = &summaries[0];
        assert_eq!(cell.win_proportion, 1.0);
        assert_eq!(cell.loss_margin_mean, None);
        assert_eq!(cell.loss_margin_sd, None);
    }

    #[test]
    fn test_interval_uses_exact_ranks() {
        // Margins 1..=1000 sorted: rank 50 -> 50, rank 950 -> 950
        let margins: Vec<i64> = (1..=1000).collect();
        let (lower, upper) = empirical_interval90(&margins).unwrap();
        assert_eq!(lower, 50);
        assert_eq!(upper, 950);
    }

    #[test]
    fn test_interval_trial_counts_validated_up_front() {
        assert!(validate_interval_trials(1000).is_ok());
        assert!(validate_interval_trials(20).is_ok());
        assert!(matches!(
            validate_interval_trials(30),
            Err(SimError::QuantileRank { .. })
        ));
        assert!(validate_interval_trials(0).is_err());
    }

    #[test]
    fn test_interval_rejects_inexact_ranks() {
        let margins: Vec<i64> = (1..=7).collect();
        assert!(matches!(
            empirical_interval90(&margins),
            Err(SimError::QuantileRank { .. })
        ));
    }

    #[test]
    fn test_margins_for_team_negates_side_b() {
        let rows = margin_batch(&[4, -2]);
        assert_eq!(margins_for_team(&rows, "Fever"), vec![4, -2]);
        assert_eq!(margins_for_team(&rows, "Swifts"), vec![-4, 2]);
        assert!(margins_for_team(&rows, "Vixens").is_empty());
    }

    #[test]
    fn test_standard_summary_grouping() {
        let mut rows = Vec::new();
        for (points, relative) in [(10u64, Some(1.0)), (14, Some(1.4)), (0, None)] {
            rows.push(StandardTrial {
                team: "Fever".to_string(),
                trial: rows.len(),
                strategy: 0.5,
                strategy_label: "Moderate".to_string(),
                shots: 10,
                standard_shots: 5,
                super_shots: 5,
                points,
                relative_points: relative,
                super_bin: Some(5),
            });
        }
        let summaries = summarize_standard(&rows).unwrap();
        assert_eq!(summaries.len(), 1);
        let cell = &summaries[0];
        assert_eq!(cell.trials, 3);
        assert!((cell.points_mean - 8.0).abs() < 1e-12);
        // Relative statistics cover only trials with a defined baseline
        assert!((cell.relative_mean.unwrap() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batches_rejected() {
        assert!(matches!(
            summarize_standard(&[]),
            Err(SimError::EmptyTrialSet)
        ));
        assert!(matches!(
            summarize_competitive(&[]),
            Err(SimError::EmptyTrialSet)
        ));
    }

    #[test]
    fn test_proportion_bins_close_on_the_left() {
        // Boundary proportions fall into the lower bin
        assert_eq!(proportion_bin(0, 10), Some(0));
        assert_eq!(proportion_bin(1, 10), Some(0));
        assert_eq!(proportion_bin(2, 10), Some(1));
        assert_eq!(proportion_bin(25, 100), Some(2));
        assert_eq!(proportion_bin(10, 10), Some(9));
        assert_eq!(proportion_bin(0, 0), None);
    }

    #[test]
    fn test_bin_bounds_round_trip() {
        for bin in 0..10 {
            let (lower, upper) = bin_bounds(bin);
            let midpoint = (lower + upper) / 2.0;
            // Scale to a 200-shot period to classify the midpoint
            let super_shots = (midpoint * 200.0).round() as u64;
            assert_eq!(proportion_bin(super_shots, 200), Some(bin));
        }
    }

    #[test]
    fn test_standard_bin_occupancy_counts_and_bounds() {
        let mut rows = Vec::new();
        for (shots, super_shots) in [(10u64, 5u64), (10, 5), (10, 4), (0, 0)] {
            let super_bin = proportion_bin(super_shots, shots);
            rows.push(StandardTrial {
                team: "Fever".to_string(),
                trial: rows.len(),
                strategy: 0.5,
                strategy_label: "Moderate".to_string(),
                shots,
                standard_shots: shots - super_shots,
                super_shots,
                points: shots,
                relative_points: None,
                super_bin,
            });
        }
        let occupancy = standard_bin_occupancy(&rows).unwrap();
        // The zero-shot trial has no bin; 4/10 and 5/10 land in bins 3
        // and 4 (boundary proportions close on the left)
        assert_eq!(occupancy.len(), 2);
        assert_eq!((occupancy[0].bin, occupancy[0].trials), (3, 1));
        assert_eq!((occupancy[1].bin, occupancy[1].trials), (4, 2));
        for row in &occupancy {
            assert_eq!((row.lower, row.upper), bin_bounds(row.bin));
            assert!(row.lower < row.upper);
        }
    }

    #[test]
    fn test_margin_histogram_unit_bins() {
        let bins = margin_histogram(&[-1, 0, 0, 2], false);
        assert_eq!(
            bins,
            vec![
                MarginBin { lower: -1, count: 1 },
                MarginBin { lower: 0, count: 2 },
                MarginBin { lower: 1, count: 0 },
                MarginBin { lower: 2, count: 1 },
            ]
        );
    }

    #[test]
    fn test_competitive_histograms_widen_only_all_out_cells() {
        let mut rows = margin_batch(&[-1, 0, 2]);
        for mut row in margin_batch(&[-2, 0, 4]) {
            row.strategy_a = 1.0;
            row.strategy_b = 1.0;
            rows.push(row);
        }
        let histogram = competitive_histograms(&rows).unwrap();
        for bar in &histogram {
            let all_out = bar.strategy == 1.0 && bar.opponent_strategy == 1.0;
            assert_eq!(bar.width, if all_out { 2 } else { 1 });
        }
        // One bar per point of margin range in the mixed cell
        let mixed: Vec<_> = histogram.iter().filter(|b| b.width == 1).collect();
        assert_eq!(mixed.len(), 4);
    }

    #[test]
    fn test_margin_histogram_doubles_for_all_out_pairings() {
        // Every margin even: width 2 keeps one possible value per bar
        let bins = margin_histogram(&[-2, 0, 0, 4], true);
        assert_eq!(
            bins,
            vec![
                MarginBin { lower: -2, count: 1 },
                MarginBin { lower: 0, count: 2 },
                MarginBin { lower: 2, count: 0 },
                MarginBin { lower: 4, count: 1 },
            ]
        );
    }
}
