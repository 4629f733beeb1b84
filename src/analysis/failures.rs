use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use crate::history::{JobStatus, Run};
use crate::insights::{FailureClass, FailureRecord};

/// Ordered markers of transient infrastructure trouble. First match wins.
static EPHEMERAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)connection refused",
        r"(?i)ECONNREFUSED",
        r"(?i)timed out retrying",
        r"(?i)TimeoutError",
        r"(?i)timed out after \d+\s?ms",
        r"(?i)retries exhausted",
        r"(?i)\btime[ds]?[\s_-]?outs?\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("ephemeral pattern is valid"))
    .collect()
});

/// Classify a failure message as ephemeral (infrastructure) or hard (real bug).
pub fn classify_failure(message: &str) -> FailureClass {
    if EPHEMERAL_PATTERNS.iter().any(|p| p.is_match(message)) {
        FailureClass::Ephemeral
    } else {
        FailureClass::Hard
    }
}

/// Extract every failed job that carries a message and classify it.
pub fn analyze_failures(runs: &[Run]) -> Vec<FailureRecord> {
    let failures: Vec<FailureRecord> = runs
        .iter()
        .flat_map(|run| {
            run.jobs
                .iter()
                .filter(|job| job.status == JobStatus::Failure)
                .filter_map(move |job| {
                    let message = job.failure_message.as_deref()?;
                    Some(FailureRecord {
                        run_id: run.id.clone(),
                        repo: run.repo.clone(),
                        branch: run.branch.clone(),
                        actor: run.actor.clone(),
                        job_name: job.name.clone(),
                        failure_message: message.to_string(),
                        classification: classify_failure(message),
                        duration_sec: job.duration_or_zero(),
                    })
                })
        })
        .collect();

    debug!(
        "Classified {} failures ({} ephemeral)",
        failures.len(),
        failures
            .iter()
            .filter(|f| f.classification == FailureClass::Ephemeral)
            .count()
    );

    failures
}
