//! Per-site run summaries
//!
//! Every worker writes `<stats-dir>/<site>_stats.json` when its session ends,
//! replacing the previous run's file. `--stats` loads and prints them.

use crate::session::{SessionOutcome, SessionReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors reading or writing run summaries
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of one site worker run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub site: String,
    pub items_processed: usize,
    pub duration_seconds: f64,
    /// `HH:MM:SS`
    pub duration_formatted: String,
    pub items_per_minute: f64,
    pub outcome: SessionOutcome,
    pub refreshes: u32,
    pub fetches: u64,
    pub skipped: usize,
    /// Dataset rows updated by the merge
    pub rows_updated: usize,
    pub config_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl RunSummary {
    pub fn from_report(report: &SessionReport, rows_updated: usize, config_hash: &str) -> Self {
        let seconds = report.duration.as_secs_f64();
        let processed = report.items_processed();
        let items_per_minute = if seconds > 0.0 {
            processed as f64 / seconds * 60.0
        } else {
            0.0
        };

        Self {
            site: report.site.clone(),
            items_processed: processed,
            duration_seconds: (seconds * 100.0).round() / 100.0,
            duration_formatted: format_duration(report.duration),
            items_per_minute: (items_per_minute * 100.0).round() / 100.0,
            outcome: report.outcome,
            refreshes: report.refreshes,
            fetches: report.fetches,
            skipped: report.skipped,
            rows_updated,
            config_hash: config_hash.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Formats a duration as `HH:MM:SS`; hours are not wrapped
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Path of a site's summary file
pub fn summary_path(dir: &Path, site: &str) -> PathBuf {
    let slug: String = site
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    dir.join(format!("{}_stats.json", slug))
}

/// Writes a summary, replacing any earlier one for the same site
pub fn write_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf, SummaryError> {
    std::fs::create_dir_all(dir)?;
    let path = summary_path(dir, &summary.site);
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json)?;

    tracing::debug!(path = %path.display(), "Wrote run summary");
    Ok(path)
}

/// Loads every summary in `dir`, sorted by site
///
/// A missing directory yields no summaries. Files that do not parse are
/// skipped with a warning.
pub fn load_summaries(dir: &Path) -> Result<Vec<RunSummary>, SummaryError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_summary = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_stats.json"));
        if !is_summary {
            continue;
        }

        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<RunSummary>(&content) {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable summary"),
        }
    }

    summaries.sort_by(|a, b| a.site.cmp(&b.site));
    Ok(summaries)
}

/// Prints summaries to stdout in a formatted manner
pub fn print_summaries(summaries: &[RunSummary]) {
    println!("=== Run Summaries ===\n");

    if summaries.is_empty() {
        println!("No run summaries found");
        return;
    }

    for s in summaries {
        let outcome = match s.outcome {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Aborted => "aborted",
        };
        println!("{} ({})", s.site, outcome);
        println!("  Finished: {}", s.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  Duration: {} ({:.1}s)", s.duration_formatted, s.duration_seconds);
        println!(
            "  Items: {} processed, {} skipped ({:.2}/min)",
            s.items_processed, s.skipped, s.items_per_minute
        );
        println!("  Fetches: {}, pool refreshes: {}", s.fetches, s.refreshes);
        println!("  Rows updated: {}", s.rows_updated);
        println!();
    }

    let total: usize = summaries.iter().map(|s| s.items_processed).sum();
    let aborted = summaries
        .iter()
        .filter(|s| s.outcome == SessionOutcome::Aborted)
        .count();
    println!(
        "Total: {} items across {} sites ({} aborted)",
        total,
        summaries.len(),
        aborted
    );
}
