use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything produced by one analysis pass over a run history.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub total_runs: usize,
    pub health: Vec<RepoHealth>,
    pub ci_minutes: Vec<RepoMinutes>,
    pub failures: Vec<FailureRecord>,
    pub time_wasted: TimeWastedSummary,
    pub flaky_tests: Vec<FlakyTest>,
    pub feedback: Vec<FeedbackCorrelation>,
    pub issues: Vec<PrioritizedIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoHealth {
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    pub total_runs: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Fraction of successful runs, in `[0, 1]`
    pub success_rate: f64,
    pub avg_duration_sec: f64,
    pub min_duration_sec: f64,
    pub max_duration_sec: f64,
    pub bottleneck_job: String,
    pub bottleneck_avg_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
    /// Transient infrastructure trouble: network, timeouts, exhausted retries
    Ephemeral,
    /// Everything else; presumed to be a real bug
    Hard,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ephemeral => write!(f, "ephemeral"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub run_id: String,
    pub repo: String,
    pub branch: String,
    pub actor: String,
    pub job_name: String,
    pub failure_message: String,
    pub classification: FailureClass,
    pub duration_sec: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryChain {
    pub repo: String,
    pub branch: String,
    pub actor: String,
    pub run_ids: Vec<String>,
    pub failed_run_ids: Vec<String>,
    pub wasted_duration_sec: f64,
    pub retry_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeWastedSummary {
    pub retry_chains: Vec<RetryChain>,
    pub total_wasted_min: f64,
    pub total_context_switch_min: f64,
    pub total_combined_waste_min: f64,
    pub waste_by_repo: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMinutes {
    pub repo: String,
    pub total_minutes: f64,
    pub successful_minutes: f64,
    pub wasted_minutes: f64,
    pub wasted_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyTest {
    pub test_pattern: String,
    pub repo: String,
    pub job_name: String,
    pub failure_count: usize,
    pub branches: Vec<String>,
    pub actors: Vec<String>,
    pub failed_run_ids: Vec<String>,
    pub retried_run_ids: Vec<String>,
    pub estimated_waste_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackCorrelation {
    pub author: String,
    pub team: String,
    pub comment: String,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    FlakyTest,
    SlowPipeline,
    Workflow,
    HardFailure,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FlakyTest => "flaky-test",
            Self::SlowPipeline => "slow-pipeline",
            Self::Workflow => "workflow",
            Self::HardFailure => "hard-failure",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizedIssue {
    pub title: String,
    pub repo: String,
    pub category: IssueCategory,
    pub frequency_raw: f64,
    pub cost_raw: f64,
    pub blast_radius_raw: f64,
    pub frequency_score: f64,
    pub cost_score: f64,
    pub blast_radius_score: f64,
    pub priority_score: f64,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}
