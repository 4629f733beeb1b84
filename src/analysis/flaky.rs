use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::{distinct, round1};
use crate::history::Run;
use crate::insights::{FailureClass, FailureRecord, FlakyTest};

/// JS/TS runners: `FAIL cypress/e2e/volunteer-signup.cy.ts > ...`
static FAIL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FAIL\s+(\S+)").expect("FAIL marker pattern is valid"));

/// pytest: `FAILED tests/integration/test_event_batch.py::test_name`
static FAILED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"FAILED\s+(\S+?)(?:::|$)").expect("FAILED marker pattern is valid")
});

const FALLBACK_SIGNATURE_CHARS: usize = 60;

/// Detect flaky tests among ephemeral failures.
///
/// A signature only counts as flaky when it fails on at least two branches or
/// for at least two actors; repetition confined to one author on one branch is
/// treated as a genuine bug. For each failure the earliest later fully
/// successful run on the same repo, branch and actor is recorded as its retry.
#[allow(clippy::cast_precision_loss)]
pub fn analyze_flaky(
    runs: &[Run],
    failures: &[FailureRecord],
    context_switch_penalty_min: f64,
) -> Vec<FlakyTest> {
    let mut groups: IndexMap<(&str, String), Vec<&FailureRecord>> = IndexMap::new();
    for failure in failures
        .iter()
        .filter(|f| f.classification == FailureClass::Ephemeral)
    {
        let signature = extract_test_signature(&failure.failure_message);
        groups
            .entry((failure.repo.as_str(), signature))
            .or_default()
            .push(failure);
    }

    let runs_by_id: HashMap<&str, &Run> = runs.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut results: Vec<FlakyTest> = groups
        .into_iter()
        .filter_map(|((repo, signature), records)| {
            let branches = distinct(records.iter().map(|r| r.branch.as_str()));
            let actors = distinct(records.iter().map(|r| r.actor.as_str()));
            if branches.len() < 2 && actors.len() < 2 {
                debug!("Skipping {signature} in {repo}: confined to one branch and actor");
                return None;
            }

            let retried_run_ids: Vec<String> = records
                .iter()
                .filter_map(|f| find_successful_retry(runs, &runs_by_id, f))
                .map(|r| r.id.clone())
                .collect();

            let wasted_sec: f64 = records.iter().map(|r| r.duration_sec).sum();
            let context_switch_min = records.len() as f64 * context_switch_penalty_min;

            Some(FlakyTest {
                test_pattern: signature,
                repo: repo.to_string(),
                job_name: records[0].job_name.clone(),
                failure_count: records.len(),
                branches,
                actors,
                failed_run_ids: records.iter().map(|r| r.run_id.clone()).collect(),
                retried_run_ids,
                estimated_waste_min: round1(wasted_sec / 60.0) + context_switch_min,
            })
        })
        .collect();

    results.sort_by(|a, b| b.failure_count.cmp(&a.failure_count));
    results
}

/// Derive a stable test signature from a failure message.
pub(crate) fn extract_test_signature(message: &str) -> String {
    if let Some(caps) = FAIL_MARKER.captures(message) {
        return caps[1].to_string();
    }
    if let Some(caps) = FAILED_MARKER.captures(message) {
        return caps[1].to_string();
    }
    message.chars().take(FALLBACK_SIGNATURE_CHARS).collect()
}

fn find_successful_retry<'a>(
    runs: &'a [Run],
    runs_by_id: &HashMap<&str, &Run>,
    failure: &FailureRecord,
) -> Option<&'a Run> {
    let failed_at = runs_by_id.get(failure.run_id.as_str())?.started_at;

    runs.iter()
        .filter(|r| {
            r.repo == failure.repo
                && r.branch == failure.branch
                && r.actor == failure.actor
                && r.started_at > failed_at
                && r.is_successful()
        })
        .min_by_key(|r| r.started_at)
}
