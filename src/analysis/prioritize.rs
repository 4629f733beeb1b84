use indexmap::IndexMap;
use log::debug;
use regex::{Regex, RegexBuilder};

use super::{cmp_f64, distinct, round1, round2, short_repo, truncate_message};
use crate::config::{AnalysisConfig, PriorityWeights};
use crate::history::{FeedbackEntry, Run};
use crate::insights::{
    FailureClass, FailureRecord, FlakyTest, IssueCategory, PrioritizedIssue, RepoHealth,
};

/// Advisory attached to hard failures: the pipeline caught a real bug.
pub const HARD_FAILURE_FLAG: &str = "Pipeline working as intended — ownership: dev team";

const DETAIL_MESSAGE_CHARS: usize = 80;

/// Tunable inputs of the prioritization engine, with the workflow pattern compiled.
#[derive(Debug, Clone)]
pub struct PrioritizationPolicy {
    pub weights: PriorityWeights,
    pub context_switch_penalty_min: f64,
    pub slow_pipeline_threshold_sec: f64,
    pub context_switch_wait_threshold_sec: f64,
    pub workflow: WorkflowRule,
}

/// Detects the "full suite runs on every change" workflow problem for one repository.
#[derive(Debug, Clone)]
pub struct WorkflowRule {
    pub comment_pattern: Regex,
    pub repo: String,
    pub suite_job: String,
    pub suite_label: String,
    pub fallback_suite_min: f64,
}

impl PrioritizationPolicy {
    pub fn from_config(config: &AnalysisConfig) -> crate::error::Result<Self> {
        let comment_pattern = RegexBuilder::new(&config.workflow.comment_pattern)
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            weights: config.weights.normalized(),
            context_switch_penalty_min: config.context_switch_penalty_min,
            slow_pipeline_threshold_sec: config.slow_pipeline_threshold_sec,
            context_switch_wait_threshold_sec: config.context_switch_wait_threshold_sec,
            workflow: WorkflowRule {
                comment_pattern,
                repo: config.workflow.repo.clone(),
                suite_job: config.workflow.suite_job.clone(),
                suite_label: config.workflow.suite_label.clone(),
                fallback_suite_min: config.workflow.fallback_suite_min,
            },
        })
    }
}

/// An issue with its raw magnitudes, before global normalization.
struct IssueCandidate {
    title: String,
    repo: String,
    category: IssueCategory,
    frequency: f64,
    cost: f64,
    blast_radius: f64,
    detail: String,
    flag: Option<String>,
}

/// Build a scored, ranked list of CI issues.
///
/// Each issue gets three dimension scores normalized against the maximum of
/// that dimension over the whole list, and a weighted composite priority.
/// Issues are returned sorted by priority descending; ties keep collection
/// order (flaky tests, slow pipelines, workflow, hard failures).
pub fn prioritize(
    flaky_tests: &[FlakyTest],
    failures: &[FailureRecord],
    health: &[RepoHealth],
    runs: &[Run],
    feedback: &[FeedbackEntry],
    policy: &PrioritizationPolicy,
) -> Vec<PrioritizedIssue> {
    let mut candidates: Vec<IssueCandidate> = flaky_tests.iter().map(flaky_issue).collect();
    candidates.extend(slow_pipeline_issues(health, runs, policy));
    candidates.extend(workflow_issue(health, runs, feedback, &policy.workflow));
    candidates.extend(hard_failure_issues(failures));

    debug!("Scoring {} issue candidates", candidates.len());

    let mut issues = score(candidates, &policy.weights);
    issues.sort_by(|a, b| cmp_f64(b.priority_score, a.priority_score));
    issues
}

#[allow(clippy::cast_precision_loss)]
fn flaky_issue(flaky: &FlakyTest) -> IssueCandidate {
    IssueCandidate {
        title: format!("Flaky test: {}", flaky.test_pattern),
        repo: flaky.repo.clone(),
        category: IssueCategory::FlakyTest,
        frequency: flaky.failure_count as f64,
        // Already includes the context-switch penalty.
        cost: flaky.estimated_waste_min,
        blast_radius: flaky.actors.len() as f64,
        detail: flaky_detail(flaky),
        flag: None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn slow_pipeline_issues(
    health: &[RepoHealth],
    runs: &[Run],
    policy: &PrioritizationPolicy,
) -> Vec<IssueCandidate> {
    health
        .iter()
        .filter(|h| h.bottleneck_avg_sec >= policy.slow_pipeline_threshold_sec)
        .map(|h| {
            let repo_runs: Vec<&Run> = runs.iter().filter(|r| r.repo == h.repo).collect();
            let actors = distinct(repo_runs.iter().map(|r| r.actor.as_str()));
            let long_runs = repo_runs
                .iter()
                .filter(|r| r.duration_sec() > policy.context_switch_wait_threshold_sec)
                .count();
            let cost = h.bottleneck_avg_sec / 60.0 * h.total_runs as f64
                + long_runs as f64 * policy.context_switch_penalty_min;

            IssueCandidate {
                title: format!(
                    "Slow pipeline: {} / {}",
                    short_repo(&h.repo),
                    h.bottleneck_job
                ),
                repo: h.repo.clone(),
                category: IssueCategory::SlowPipeline,
                frequency: h.total_runs as f64,
                cost: round1(cost),
                blast_radius: actors.len() as f64,
                detail: slow_pipeline_detail(h),
                flag: None,
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn workflow_issue(
    health: &[RepoHealth],
    runs: &[Run],
    feedback: &[FeedbackEntry],
    rule: &WorkflowRule,
) -> Option<IssueCandidate> {
    if !feedback
        .iter()
        .any(|f| rule.comment_pattern.is_match(&f.comment))
    {
        return None;
    }

    let Some(h) = health.iter().find(|h| h.repo.contains(&rule.repo)) else {
        debug!(
            "Full-suite feedback found but no health data for {}",
            rule.repo
        );
        return None;
    };

    let actors = distinct(
        runs.iter()
            .filter(|r| r.repo == h.repo)
            .map(|r| r.actor.as_str()),
    );
    let suite_min = if h.bottleneck_job == rule.suite_job {
        h.bottleneck_avg_sec / 60.0
    } else {
        rule.fallback_suite_min
    };

    Some(IssueCandidate {
        title: format!(
            "Workflow: unnecessary {} runs on {}",
            rule.suite_label,
            short_repo(&h.repo)
        ),
        repo: h.repo.clone(),
        category: IssueCategory::Workflow,
        frequency: h.total_runs as f64,
        cost: round1(suite_min * h.total_runs as f64),
        blast_radius: actors.len() as f64,
        detail: format!(
            "Developer feedback indicates the full {suite} suite runs on every change, \
             even when only unrelated files changed. Add path filters to skip {suite} \
             for those changes and run the full suite on merge to the default branch.",
            suite = rule.suite_label
        ),
        flag: None,
    })
}

#[allow(clippy::cast_precision_loss)]
fn hard_failure_issues(failures: &[FailureRecord]) -> Vec<IssueCandidate> {
    let groups: IndexMap<(&str, &str), Vec<&FailureRecord>> = failures
        .iter()
        .filter(|f| f.classification == FailureClass::Hard)
        .fold(IndexMap::new(), |mut grouped, f| {
            grouped
                .entry((f.repo.as_str(), f.job_name.as_str()))
                .or_default()
                .push(f);
            grouped
        });

    groups
        .into_iter()
        .map(|((repo, job_name), records)| {
            let actors = distinct(records.iter().map(|r| r.actor.as_str()));
            IssueCandidate {
                title: format!("Hard failure: {} / {}", short_repo(repo), job_name),
                repo: repo.to_string(),
                category: IssueCategory::HardFailure,
                frequency: records.len() as f64,
                cost: 0.0,
                blast_radius: actors.len() as f64,
                detail: records
                    .iter()
                    .map(|r| {
                        format!(
                            "{}: {}",
                            r.run_id,
                            truncate_message(&r.failure_message, DETAIL_MESSAGE_CHARS)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                flag: Some(HARD_FAILURE_FLAG.to_string()),
            }
        })
        .collect()
}

/// Normalize every dimension against its maximum over the complete candidate
/// list (floored at 1) and compute the weighted composite.
fn score(candidates: Vec<IssueCandidate>, weights: &PriorityWeights) -> Vec<PrioritizedIssue> {
    let max_of = |dimension: fn(&IssueCandidate) -> f64| {
        candidates.iter().map(dimension).fold(1.0_f64, f64::max)
    };
    let max_frequency = max_of(|c| c.frequency);
    let max_cost = max_of(|c| c.cost);
    let max_blast_radius = max_of(|c| c.blast_radius);

    candidates
        .into_iter()
        .map(|c| {
            let frequency_score = round2(c.frequency / max_frequency);
            let cost_score = round2(c.cost / max_cost);
            let blast_radius_score = round2(c.blast_radius / max_blast_radius);
            let priority_score = round2(
                weights.frequency * frequency_score
                    + weights.cost * cost_score
                    + weights.blast_radius * blast_radius_score,
            );

            PrioritizedIssue {
                title: c.title,
                repo: c.repo,
                category: c.category,
                frequency_raw: c.frequency,
                cost_raw: c.cost,
                blast_radius_raw: c.blast_radius,
                frequency_score,
                cost_score,
                blast_radius_score,
                priority_score,
                detail: c.detail,
                flag: c.flag,
            }
        })
        .collect()
}

fn flaky_detail(flaky: &FlakyTest) -> String {
    let mut lines = vec![
        format!(
            "{} failures across {} branches and {} authors, not caused by code changes.",
            flaky.failure_count,
            flaky.branches.len(),
            flaky.actors.len()
        ),
        format!(
            "Job: {}. Affected branches: {}.",
            flaky.job_name,
            flaky.branches.join(", ")
        ),
        format!(
            "Estimated waste: ~{} min (CI time + developer context-switch).",
            flaky.estimated_waste_min
        ),
    ];
    if !flaky.retried_run_ids.is_empty() {
        lines.push(format!(
            "Successful retries: {}.",
            flaky.retried_run_ids.join(", ")
        ));
    }
    lines.join("\n")
}

fn slow_pipeline_detail(h: &RepoHealth) -> String {
    format!(
        "Bottleneck job \"{}\" averages {}. Developers context-switch during this wait. \
         Consider profiling the suite, parallelizing tests, or splitting it into fast and slow tiers.",
        h.bottleneck_job,
        format_duration(h.bottleneck_avg_sec)
    )
}

/// `45s`, `3m`, `3m 20s`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{}s", seconds.round() as u64);
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let remainder = (seconds % 60.0).round() as u64;
    if remainder > 0 {
        format!("{minutes}m {remainder}s")
    } else {
        format!("{minutes}m")
    }
}
