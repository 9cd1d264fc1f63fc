use crate::baseline::heuristic_estimate;
use crate::models::{GlobalStatistics, StoryStatistics, SummaryReport, UserStory};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print a benchmark summary in the specified format
pub fn print_summary(summary: &SummaryReport, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print!("{}", format_plain(summary)),
        OutputFormat::Json => print_json(summary),
    }
}

/// Render a summary as plain text
fn format_plain(summary: &SummaryReport) -> String {
    let mut out = String::new();
    out.push_str("\n=== BENCHMARK SUMMARY ===\n");
    out.push_str(&format_global(summary.global.as_ref()));
    out.push_str("\nPer-Story Statistics:\n");
    for (story_id, stats) in &summary.stories {
        out.push_str(&format_story_line(*story_id, stats));
        out.push('\n');
    }
    out
}

fn format_global(global: Option<&GlobalStatistics>) -> String {
    match global {
        Some(global) => format!(
            "Global Statistics:\n  Mean estimate: {:.2}\n  Standard deviation: {:.2}\n  Median (p50): {:.2}\n  90th percentile: {:.2}\n",
            global.mean, global.std, global.p50, global.p90
        ),
        None => "Global Statistics: No valid estimates found\n".to_string(),
    }
}

fn format_story_line(story_id: i64, stats: &StoryStatistics) -> String {
    match (stats.mean, stats.std, stats.consistency_within_1) {
        (Some(mean), Some(std), Some(consistency)) => format!(
            "  Story {}: mean={:.2}, std={:.2}, consistency={:.2}",
            story_id, mean, std, consistency
        ),
        _ => format!("  Story {}: No valid estimates", story_id),
    }
}

/// Print a summary in JSON format
fn print_json(summary: &SummaryReport) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing summary to JSON: {}", e),
    }
}

/// Print the keyword baseline next to the model means, when known
pub fn print_baseline(stories: &[UserStory], model_means: &BTreeMap<i64, StoryStatistics>) {
    print!("{}", format_baseline(stories, model_means));
}

fn format_baseline(stories: &[UserStory], model_means: &BTreeMap<i64, StoryStatistics>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:<10} {:<10} {:<8}", "Story", "Baseline", "Model", "Diff");
    out.push_str(&"-".repeat(40));
    out.push('\n');

    for story in stories {
        let baseline = heuristic_estimate(&story.story);
        let model_mean = model_means.get(&story.id).and_then(|s| s.mean);
        let _ = match model_mean {
            Some(mean) => writeln!(
                out,
                "{:<8} {:<10} {:<10.2} {:<+8.2}",
                story.id,
                baseline,
                mean,
                mean - baseline as f64
            ),
            None => writeln!(out, "{:<8} {:<10} {:<10} {:<8}", story.id, baseline, "-", "-"),
        };
    }

    out
}
