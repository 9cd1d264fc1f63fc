use crate::dataset;
use crate::extraction::extract_estimate;
use crate::models::{GlobalStatistics, StoryStatistics, SummaryReport, TrialRecord};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Collect the usable estimates of a set of records.
///
/// A finite pre-extracted estimate is trusted as-is; otherwise the raw output
/// is parsed again.
pub fn usable_estimates(records: &[TrialRecord]) -> Vec<f64> {
    records
        .iter()
        .filter_map(|record| match record.estimate {
            Some(estimate) if estimate.is_finite() => Some(estimate),
            _ => {
                let recovered = extract_estimate(&record.raw_output);
                if recovered.is_none() {
                    debug!(
                        story_id = record.story_id,
                        trial = record.trial_index,
                        "no usable estimate in model output"
                    );
                }
                recovered
            }
        })
        .collect()
}

/// Compute statistics for the records of a single story
pub fn aggregate_story(records: &[TrialRecord]) -> StoryStatistics {
    story_statistics(records.len(), &usable_estimates(records))
}

fn story_statistics(n_trials: usize, estimates: &[f64]) -> StoryStatistics {
    if estimates.is_empty() {
        return StoryStatistics {
            n_trials,
            mean: None,
            std: None,
            cv: None,
            consistency_within_1: None,
        };
    }

    let mean = calculate_mean(estimates);
    let std = calculate_std(estimates, mean);
    let cv = if mean != 0.0 { Some(std / mean) } else { None };

    let within_one = estimates
        .iter()
        .filter(|estimate| (*estimate - mean).abs() <= 1.0)
        .count();
    let consistency = within_one as f64 / estimates.len() as f64;

    StoryStatistics {
        n_trials,
        mean: Some(mean),
        std: Some(std),
        cv,
        consistency_within_1: Some(consistency),
    }
}

/// Compute statistics across every usable estimate of a run
pub fn aggregate_global(estimates: &[f64]) -> Option<GlobalStatistics> {
    if estimates.is_empty() {
        return None;
    }

    // Sorting first makes the sums independent of input order.
    let mut sorted = estimates.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mean = calculate_mean(&sorted);
    Some(GlobalStatistics {
        mean,
        std: calculate_std(&sorted, mean),
        p50: percentile_sorted(&sorted, 50.0),
        p90: percentile_sorted(&sorted, 90.0),
    })
}

/// Build the summary report for a full set of trial records.
///
/// Stories are keyed in ascending id order.
pub fn assemble_summary(records: &[TrialRecord]) -> SummaryReport {
    let mut groups: BTreeMap<i64, Vec<TrialRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.story_id).or_default().push(record.clone());
    }

    let mut stories = BTreeMap::new();
    let mut all_estimates = Vec::new();

    for (story_id, group) in &groups {
        let estimates = usable_estimates(group);
        stories.insert(*story_id, story_statistics(group.len(), &estimates));
        all_estimates.extend(estimates);
    }

    SummaryReport {
        stories,
        global: aggregate_global(&all_estimates),
    }
}

/// Calculate the arithmetic mean of a non-empty slice
fn calculate_mean(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    sum / values.len() as f64
}

/// Population standard deviation (divisor N)
fn calculate_std(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linear interpolation between closest ranks over an ascending slice
fn percentile_sorted(sorted: &[f64], percentile: f64) -> f64 {
    let rank = (percentile / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Store a summary report as pretty JSON, replacing any previous report
pub fn write_summary(path: &Path, summary: &SummaryReport) -> Result<()> {
    let json_content =
        serde_json::to_string_pretty(summary).context("Failed to serialize summary to JSON")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, json_content)
        .with_context(|| format!("Failed to write summary to: {}", path.display()))
}

/// Load a previously stored summary report
pub fn read_summary(path: &Path) -> Result<SummaryReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read summary file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse summary JSON: {}", path.display()))
}

/// Recompute a summary from a stored per-trial table
pub fn evaluate_file(outputs_csv: &Path, summary_path: &Path) -> Result<SummaryReport> {
    let records = dataset::read_trial_records(outputs_csv)?;
    info!(
        records = records.len(),
        path = %outputs_csv.display(),
        "loaded trial records"
    );

    let summary = assemble_summary(&records);
    write_summary(summary_path, &summary)?;
    info!(path = %summary_path.display(), "benchmark summary saved");

    Ok(summary)
}
