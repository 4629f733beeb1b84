mod ci_minutes;
mod failures;
mod feedback;
mod flaky;
mod health;
mod prioritize;
mod time_wasted;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::Utc;
use indexmap::IndexSet;
use log::info;
use std::cmp::Ordering;

use crate::config::AnalysisConfig;
use crate::history::Dataset;
use crate::insights::AnalysisReport;

pub use ci_minutes::analyze_ci_minutes;
pub use failures::analyze_failures;
pub use feedback::{analyze_feedback, NO_MATCH_EVIDENCE};
pub use flaky::analyze_flaky;
pub use health::analyze_health;
pub(crate) use prioritize::format_duration;
pub use prioritize::{prioritize, PrioritizationPolicy};
pub use time_wasted::analyze_time_wasted;

/// Runs every analyzer over the dataset and bundles the results.
///
/// Fails only when the configured policy is invalid (e.g. a bad regex); the
/// analyzers themselves are total over well-typed input.
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> crate::error::Result<AnalysisReport> {
    config.validate()?;
    let policy = PrioritizationPolicy::from_config(config)?;
    let penalty = config.context_switch_penalty_min;

    let failures = analyze_failures(&dataset.runs);
    let health = analyze_health(&dataset.runs, &dataset.workflows);
    let ci_minutes = analyze_ci_minutes(&dataset.runs);
    let time_wasted = analyze_time_wasted(&dataset.runs, penalty);
    let flaky_tests = analyze_flaky(&dataset.runs, &failures, penalty);
    let feedback = analyze_feedback(
        &dataset.feedback,
        &failures,
        &flaky_tests,
        &config.correlation_rules,
    );
    let issues = prioritize(
        &flaky_tests,
        &failures,
        &health,
        &dataset.runs,
        &dataset.feedback,
        &policy,
    );

    info!(
        "Analysis complete: {} repos, {} failures, {} flaky tests, {} issues",
        health.len(),
        failures.len(),
        flaky_tests.len(),
        issues.len()
    );

    Ok(AnalysisReport {
        generated_at: Utc::now(),
        total_runs: dataset.runs.len(),
        health,
        ci_minutes,
        failures,
        time_wasted,
        flaky_tests,
        feedback,
        issues,
    })
}

pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

pub(crate) fn round1(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

pub(crate) fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Distinct values in first-seen order.
pub(crate) fn distinct<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .collect::<IndexSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Collapse newlines (real or escaped) and cap the message at `max_len` characters.
pub(crate) fn truncate_message(message: &str, max_len: usize) -> String {
    let clean = message.replace("\\n", " ").replace('\n', " ");
    if clean.chars().count() > max_len {
        let mut cut: String = clean.chars().take(max_len).collect();
        cut.push('…');
        cut
    } else {
        clean
    }
}

/// Strip the owner prefix from an `owner/repo` path.
pub(crate) fn short_repo(repo: &str) -> &str {
    repo.rsplit_once('/').map_or(repo, |(_, name)| name)
}
