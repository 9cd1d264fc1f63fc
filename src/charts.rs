//! SVG charts over a benchmark summary and its per-trial table.
//!
//! Rendering is pure presentation: nothing here feeds back into the report.

use crate::evaluation::usable_estimates;
use crate::models::{StoryStatistics, SummaryReport, TrialRecord};
use anyhow::{Context, Result};
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const NO_ESTIMATES: &str = "No valid estimates found";
/// Wider estimate ranges get equal-width bins instead of one per point
const MAX_POINT_BINS: usize = 50;

/// Plotting area inside an SVG document
#[derive(Debug, Clone, Copy)]
struct Panel {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Panel {
    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    fn x_for(&self, value: f64, scale: &Scale) -> f64 {
        self.left + scale.fraction(value) * self.width
    }

    fn y_for(&self, value: f64, scale: &Scale) -> f64 {
        self.bottom() - scale.fraction(value) * self.height
    }
}

/// Linear value range of an axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    min: f64,
    max: f64,
}

impl Scale {
    /// Range that always includes zero, padded above the data
    fn from_zero(values: impl IntoIterator<Item = f64>) -> Self {
        let (mut min, mut max) = (0.0_f64, 0.0_f64);
        for value in values {
            min = min.min(value);
            max = max.max(value);
        }
        if max - min <= 0.0 {
            max = 1.0;
        }
        Self {
            min: min * 1.1,
            max: max * 1.15,
        }
    }

    /// Range covering the data with a margin on both sides
    fn spanning(values: impl IntoIterator<Item = f64>) -> Self {
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for value in values {
            min = min.min(value);
            max = max.max(value);
        }
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if max - min <= 0.0 {
            return Self {
                min: min - 1.0,
                max: max + 1.0,
            };
        }
        let pad = (max - min) * 0.1;
        Self {
            min: min - pad,
            max: max + pad,
        }
    }

    fn fraction(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }
}

/// Render every chart into `charts_dir`, returning the written paths
pub fn render_all(
    summary: &SummaryReport,
    records: &[TrialRecord],
    charts_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(charts_dir)
        .with_context(|| format!("Failed to create directory: {}", charts_dir.display()))?;

    let charts = [
        ("estimation_analysis.svg", estimation_analysis(summary, records)),
        ("consistency_heatmap.svg", consistency_heatmap(summary)),
        ("performance_metrics.svg", performance_metrics(summary, records)),
        ("research_summary.svg", research_summary(summary)),
    ];

    let mut written = Vec::new();
    for (name, rendered) in charts {
        let svg = rendered.with_context(|| format!("Failed to render chart: {}", name))?;
        let path = charts_dir.join(name);
        std::fs::write(&path, svg)
            .with_context(|| format!("Failed to write chart: {}", path.display()))?;
        info!(path = %path.display(), "chart written");
        written.push(path);
    }

    Ok(written)
}

/// Distribution of all estimates next to per-story means with std error bars
pub fn estimation_analysis(
    summary: &SummaryReport,
    records: &[TrialRecord],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    open_svg(&mut out, 1200, 520, "Sprint Effort Estimation Analysis")?;

    let estimates = usable_estimates(records);
    let left = Panel {
        left: 70.0,
        top: 90.0,
        width: 470.0,
        height: 340.0,
    };
    draw_histogram(
        &mut out,
        &left,
        "Distribution of LLM Estimates",
        "Story Points",
        &estimates,
        &integer_edges(&estimates),
        "#87ceeb",
    )?;

    let (labels, means, stds) = story_series(summary);
    let right = Panel {
        left: 670.0,
        ..left
    };
    draw_bars(
        &mut out,
        &right,
        "Per-Story Estimates with Standard Deviation",
        "Mean Story Points",
        &labels,
        &means,
        Some(stds.as_slice()),
        "#f08080",
    )?;

    close_svg(&mut out)?;
    Ok(out)
}

/// Consistency and mean estimate per story as a coloured grid
pub fn consistency_heatmap(summary: &SummaryReport) -> Result<String, fmt::Error> {
    let rows: Vec<(i64, f64, f64)> = summary
        .stories
        .iter()
        .filter_map(|(id, stats)| Some((*id, stats.consistency_within_1?, stats.mean?)))
        .collect();

    let row_height = 36.0;
    let height = (140.0 + row_height * rows.len().max(1) as f64) as u32;
    let mut out = String::new();
    open_svg(&mut out, 700, height, "Story Consistency and Mean Estimates Heatmap")?;

    let grid = Panel {
        left: 160.0,
        top: 90.0,
        width: 440.0,
        height: row_height * rows.len().max(1) as f64,
    };

    if rows.is_empty() {
        draw_placeholder(&mut out, &grid, NO_ESTIMATES)?;
        close_svg(&mut out)?;
        return Ok(out);
    }

    let scale = Scale::spanning(rows.iter().flat_map(|(_, c, m)| [*c, *m]));
    let cell_width = grid.width / 2.0;

    for (column, header) in ["Consistency (within ±1)", "Mean Estimate"].iter().enumerate() {
        writeln!(
            out,
            r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" fill="#1e293b" text-anchor="middle">{}</text>"##,
            grid.left + cell_width * (column as f64 + 0.5),
            grid.top - 10.0,
            escape(header)
        )?;
    }

    for (row, (id, consistency, mean)) in rows.iter().enumerate() {
        let y = grid.top + row as f64 * row_height;
        writeln!(
            out,
            r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" fill="#1e293b" text-anchor="end">Story {}</text>"##,
            grid.left - 10.0,
            y + row_height / 2.0 + 4.0,
            id
        )?;

        for (column, value) in [*consistency, *mean].iter().enumerate() {
            let x = grid.left + column as f64 * cell_width;
            writeln!(
                out,
                r##"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="#ffffff"/>"##,
                x,
                y,
                cell_width,
                row_height,
                heat_color(scale.fraction(*value))
            )?;
            writeln!(
                out,
                r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" font-weight="bold" fill="#000000" text-anchor="middle">{:.2}</text>"##,
                x + cell_width / 2.0,
                y + row_height / 2.0 + 4.0,
                value
            )?;
        }
    }

    close_svg(&mut out)?;
    Ok(out)
}

/// Latency, global statistics, consistency spread and story id vs mean
pub fn performance_metrics(
    summary: &SummaryReport,
    records: &[TrialRecord],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    open_svg(
        &mut out,
        1200,
        960,
        "Sprint Effort Estimation Performance Metrics",
    )?;

    let top_left = Panel {
        left: 70.0,
        top: 90.0,
        width: 470.0,
        height: 320.0,
    };
    let top_right = Panel {
        left: 670.0,
        ..top_left
    };
    let bottom_left = Panel {
        top: 560.0,
        ..top_left
    };
    let bottom_right = Panel {
        top: 560.0,
        ..top_right
    };

    let response_times: Vec<f64> = records.iter().map(|r| r.response_time).collect();
    draw_histogram(
        &mut out,
        &top_left,
        "LLM Response Time Distribution",
        "Response Time (seconds)",
        &response_times,
        &even_edges(&response_times, 15),
        "#90ee90",
    )?;

    match &summary.global {
        Some(global) => {
            let labels: Vec<String> = ["Mean", "Std Dev", "Median", "P90"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            draw_bars(
                &mut out,
                &top_right,
                "Global Statistics",
                "Story Points",
                &labels,
                &[global.mean, global.std, global.p50, global.p90],
                None,
                "#4169e1",
            )?;
        }
        None => {
            draw_title(&mut out, &top_right, "Global Statistics")?;
            draw_placeholder(&mut out, &top_right, NO_ESTIMATES)?;
        }
    }

    let consistency: Vec<f64> = summary
        .stories
        .values()
        .filter_map(|s| s.consistency_within_1)
        .collect();
    draw_histogram(
        &mut out,
        &bottom_left,
        "Consistency Distribution",
        "Consistency Score",
        &consistency,
        &even_edges(&consistency, 8),
        "#800080",
    )?;

    let points: Vec<(f64, f64)> = summary
        .stories
        .iter()
        .filter_map(|(id, stats)| Some((*id as f64, stats.mean?)))
        .collect();
    draw_scatter(
        &mut out,
        &bottom_right,
        "Story Id vs Mean Estimate",
        "Story Id",
        &points,
    )?;

    close_svg(&mut out)?;
    Ok(out)
}

/// Per-story means with error bars and the consistency score overlaid
pub fn research_summary(summary: &SummaryReport) -> Result<String, fmt::Error> {
    let title = match &summary.global {
        Some(global) => format!(
            "LLM Story Point Estimates | Global Mean: {:.2} ± {:.2}",
            global.mean, global.std
        ),
        None => "LLM Story Point Estimates".to_string(),
    };

    let mut out = String::new();
    open_svg(&mut out, 1100, 640, &title)?;

    let panel = Panel {
        left: 80.0,
        top: 90.0,
        width: 900.0,
        height: 440.0,
    };

    let (labels, means, stds) = story_series(summary);
    draw_bars(
        &mut out,
        &panel,
        "Mean Estimate and Consistency per Story",
        "Story Points",
        &labels,
        &means,
        Some(stds.as_slice()),
        "#4682b4",
    )?;

    let consistency: Vec<f64> = summary
        .stories
        .values()
        .filter(|s| s.mean.is_some())
        .map(|s| s.consistency_within_1.unwrap_or(0.0))
        .collect();

    if !consistency.is_empty() {
        let scale = Scale { min: 0.0, max: 1.1 };
        let slot = panel.width / consistency.len() as f64;
        let coords: Vec<(f64, f64)> = consistency
            .iter()
            .enumerate()
            .map(|(i, c)| (panel.left + slot * (i as f64 + 0.5), panel.y_for(*c, &scale)))
            .collect();
        let points: Vec<String> = coords
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect();

        writeln!(
            out,
            r##"  <polyline points="{}" fill="none" stroke="#ff0000" stroke-width="2"/>"##,
            points.join(" ")
        )?;
        for (x, y) in &coords {
            writeln!(
                out,
                r##"  <circle cx="{:.1}" cy="{:.1}" r="5" fill="#ff0000"/>"##,
                x, y
            )?;
        }

        for step in 0..=4 {
            let value = step as f64 * 0.25;
            writeln!(
                out,
                r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="10" fill="#ff0000">{:.2}</text>"##,
                panel.right() + 6.0,
                panel.y_for(value, &scale) + 4.0,
                value
            )?;
        }
        writeln!(
            out,
            r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" fill="#ff0000" text-anchor="middle" transform="rotate(90 {:.1} {:.1})">Consistency Score</text>"##,
            panel.right() + 50.0,
            panel.top + panel.height / 2.0,
            panel.right() + 50.0,
            panel.top + panel.height / 2.0
        )?;
    }

    close_svg(&mut out)?;
    Ok(out)
}

/// Labels, means and stds of the stories that have a usable mean
fn story_series(summary: &SummaryReport) -> (Vec<String>, Vec<f64>, Vec<f64>) {
    let rows: Vec<(&i64, &StoryStatistics)> = summary
        .stories
        .iter()
        .filter(|(_, stats)| stats.mean.is_some())
        .collect();

    let labels = rows.iter().map(|(id, _)| format!("Story {}", id)).collect();
    let means = rows.iter().filter_map(|(_, s)| s.mean).collect();
    let stds = rows.iter().map(|(_, s)| s.std.unwrap_or(0.0)).collect();
    (labels, means, stds)
}

/// One bin per story point between the smallest and largest estimate
fn integer_edges(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min).floor();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max).floor();
    if max - min >= MAX_POINT_BINS as f64 {
        return even_edges(values, MAX_POINT_BINS);
    }
    let bins = (max - min) as usize + 1;
    (0..=bins).map(|i| min + i as f64).collect()
}

/// `bins` equal-width bins over the data range
fn even_edges(values: &[f64], bins: usize) -> Vec<f64> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min <= 0.0 {
        min -= 0.5;
        max += 0.5;
    }
    // Weighted form stays finite even when `max - min` overflows.
    (0..=bins)
        .map(|i| {
            let t = i as f64 / bins as f64;
            min * (1.0 - t) + max * t
        })
        .collect()
}

/// Count values per bin; bins are half-open except the last
fn histogram_counts(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0; bins];

    for &value in values {
        for bin in 0..bins {
            let upper_ok = value < edges[bin + 1] || (bin == bins - 1 && value <= edges[bin + 1]);
            if value >= edges[bin] && upper_ok {
                counts[bin] += 1;
                break;
            }
        }
    }

    counts
}

/// Map a 0..1 fraction onto a blue-yellow-red ramp
fn heat_color(fraction: f64) -> String {
    let t = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let (low, mid, high) = ((69.0, 117.0, 180.0), (255.0, 255.0, 191.0), (215.0, 48.0, 39.0));
    let (from, to, local) = if t < 0.5 {
        (low, mid, t * 2.0)
    } else {
        (mid, high, (t - 0.5) * 2.0)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * local).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(from.0, to.0),
        lerp(from.1, to.1),
        lerp(from.2, to.2)
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn open_svg(out: &mut String, width: u32, height: u32, title: &str) -> fmt::Result {
    writeln!(
        out,
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}">"##
    )?;
    writeln!(
        out,
        r##"  <rect width="{width}" height="{height}" fill="#ffffff"/>"##
    )?;
    writeln!(
        out,
        r##"  <text x="{}" y="36" font-family="sans-serif" font-size="20" font-weight="bold" fill="#0f172a" text-anchor="middle">{}</text>"##,
        width / 2,
        escape(title)
    )
}

fn close_svg(out: &mut String) -> fmt::Result {
    writeln!(out, "</svg>")
}

fn draw_title(out: &mut String, panel: &Panel, title: &str) -> fmt::Result {
    writeln!(
        out,
        r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="14" font-weight="bold" fill="#0f172a" text-anchor="middle">{}</text>"##,
        panel.center_x(),
        panel.top - 14.0,
        escape(title)
    )
}

fn draw_placeholder(out: &mut String, panel: &Panel, text: &str) -> fmt::Result {
    writeln!(
        out,
        r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="14" fill="#64748b" text-anchor="middle">{}</text>"##,
        panel.center_x(),
        panel.top + panel.height / 2.0,
        escape(text)
    )
}

/// Axes, horizontal grid with value ticks and axis labels
fn draw_axes(
    out: &mut String,
    panel: &Panel,
    x_label: &str,
    y_label: &str,
    scale: &Scale,
) -> fmt::Result {
    for step in 0..=4 {
        let value = scale.min + (scale.max - scale.min) * step as f64 / 4.0;
        let y = panel.y_for(value, scale);
        writeln!(
            out,
            r##"  <line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#e2e8f0" stroke-dasharray="2,2"/>"##,
            panel.left,
            y,
            panel.right(),
            y
        )?;
        writeln!(
            out,
            r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="10" fill="#64748b" text-anchor="end">{:.2}</text>"##,
            panel.left - 6.0,
            y + 4.0,
            value
        )?;
    }

    writeln!(
        out,
        r##"  <path d="M{:.1} {:.1} V{:.1} H{:.1}" fill="none" stroke="#334155"/>"##,
        panel.left,
        panel.top,
        panel.bottom(),
        panel.right()
    )?;
    writeln!(
        out,
        r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" fill="#1e293b" text-anchor="middle">{}</text>"##,
        panel.center_x(),
        panel.bottom() + 48.0,
        escape(x_label)
    )?;
    let y_mid = panel.top + panel.height / 2.0;
    writeln!(
        out,
        r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" fill="#1e293b" text-anchor="middle" transform="rotate(-90 {:.1} {:.1})">{}</text>"##,
        panel.left - 50.0,
        y_mid,
        panel.left - 50.0,
        y_mid,
        escape(y_label)
    )
}

fn draw_histogram(
    out: &mut String,
    panel: &Panel,
    title: &str,
    x_label: &str,
    values: &[f64],
    edges: &[f64],
    color: &str,
) -> fmt::Result {
    draw_title(out, panel, title)?;
    if values.is_empty() || edges.len() < 2 {
        return draw_placeholder(out, panel, NO_ESTIMATES);
    }

    let counts = histogram_counts(values, edges);
    let y_scale = Scale::from_zero(counts.iter().map(|c| *c as f64));
    let x_scale = Scale {
        min: edges[0],
        max: edges[edges.len() - 1],
    };
    draw_axes(out, panel, x_label, "Frequency", &y_scale)?;

    for (bin, count) in counts.iter().enumerate() {
        let x0 = panel.x_for(edges[bin], &x_scale);
        let x1 = panel.x_for(edges[bin + 1], &x_scale);
        let y = panel.y_for(*count as f64, &y_scale);
        writeln!(
            out,
            r##"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="0.7" stroke="#000000"/>"##,
            x0,
            y,
            (x1 - x0).max(0.0),
            (panel.y_for(0.0, &y_scale) - y).max(0.0),
            color
        )?;
    }

    for edge in edges {
        writeln!(
            out,
            r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="10" fill="#64748b" text-anchor="middle">{:.1}</text>"##,
            panel.x_for(*edge, &x_scale),
            panel.bottom() + 16.0,
            edge
        )?;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let x = panel.x_for(mean, &x_scale);
    writeln!(
        out,
        r##"  <line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#ff0000" stroke-width="2" stroke-dasharray="6,4"/>"##,
        x,
        panel.top,
        x,
        panel.bottom()
    )?;
    writeln!(
        out,
        r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11" fill="#ff0000">Mean: {:.2}</text>"##,
        x + 4.0,
        panel.top + 14.0,
        mean
    )
}

#[allow(clippy::too_many_arguments)]
fn draw_bars(
    out: &mut String,
    panel: &Panel,
    title: &str,
    y_label: &str,
    labels: &[String],
    values: &[f64],
    errors: Option<&[f64]>,
    color: &str,
) -> fmt::Result {
    draw_title(out, panel, title)?;
    if values.is_empty() {
        return draw_placeholder(out, panel, NO_ESTIMATES);
    }

    let error_at = |i: usize| errors.and_then(|e| e.get(i)).copied().unwrap_or(0.0);
    let scale = Scale::from_zero(
        values
            .iter()
            .enumerate()
            .flat_map(|(i, v)| [v + error_at(i), v - error_at(i)]),
    );
    draw_axes(out, panel, "", y_label, &scale)?;

    let slot = panel.width / values.len() as f64;
    let bar_width = slot * 0.6;
    let baseline = panel.y_for(0.0, &scale);

    for (i, value) in values.iter().enumerate() {
        let center = panel.left + slot * (i as f64 + 0.5);
        let top = panel.y_for(*value, &scale);
        writeln!(
            out,
            r##"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="0.7"/>"##,
            center - bar_width / 2.0,
            top.min(baseline),
            bar_width,
            (baseline - top).abs(),
            color
        )?;

        let error = error_at(i);
        if error > 0.0 {
            let high = panel.y_for(value + error, &scale);
            let low = panel.y_for(value - error, &scale);
            writeln!(
                out,
                r##"  <path d="M{:.1} {:.1} V{:.1} M{:.1} {:.1} H{:.1} M{:.1} {:.1} H{:.1}" stroke="#000000" fill="none"/>"##,
                center,
                high,
                low,
                center - 5.0,
                high,
                center + 5.0,
                center - 5.0,
                low,
                center + 5.0
            )?;
        }

        writeln!(
            out,
            r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11" font-weight="bold" fill="#1e293b" text-anchor="middle">{:.2}</text>"##,
            center,
            panel.y_for(value + error, &scale) - 6.0,
            value
        )?;

        let label_y = panel.bottom() + 16.0;
        writeln!(
            out,
            r##"  <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="10" fill="#64748b" text-anchor="end" transform="rotate(-45 {:.1} {:.1})">{}</text>"##,
            center,
            label_y,
            center,
            label_y,
            escape(labels.get(i).map(String::as_str).unwrap_or(""))
        )?;
    }

    Ok(())
}

fn draw_scatter(
    out: &mut String,
    panel: &Panel,
    title: &str,
    x_label: &str,
    points: &[(f64, f64)],
) -> fmt::Result {
    draw_title(out, panel, title)?;
    if points.is_empty() {
        return draw_placeholder(out, panel, NO_ESTIMATES);
    }

    let x_scale = Scale::spanning(points.iter().map(|p| p.0));
    let y_scale = Scale::spanning(points.iter().map(|p| p.1));
    draw_axes(out, panel, x_label, "Mean Estimate", &y_scale)?;

    for (x, y) in points {
        writeln!(
            out,
            r##"  <circle cx="{:.1}" cy="{:.1}" r="6" fill="#00008b" fill-opacity="0.7"/>"##,
            panel.x_for(*x, &x_scale),
            panel.y_for(*y, &y_scale)
        )?;
    }

    if let Some((slope, intercept)) = linear_fit(points) {
        let (x0, x1) = (x_scale.min, x_scale.max);
        writeln!(
            out,
            r##"  <line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#ff0000" stroke-dasharray="6,4" stroke-opacity="0.8"/>"##,
            panel.x_for(x0, &x_scale),
            panel.y_for(slope * x0 + intercept, &y_scale),
            panel.x_for(x1, &x_scale),
            panel.y_for(slope * x1 + intercept, &y_scale)
        )?;
    }

    Ok(())
}

/// Least-squares line through the points, if at least two distinct x exist
fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}
