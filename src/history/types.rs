use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single job inside a CI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failure,
    Skipped,
}

/// Job within a CI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Name of the job (e.g. `unit-tests`)
    pub name: String,
    /// Final status of the job
    pub status: JobStatus,
    /// Wall-clock duration in seconds, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    /// Failure output, normally present only for failed jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl Job {
    pub fn duration_or_zero(&self) -> f64 {
        self.duration_sec.unwrap_or(0.0)
    }
}

/// A single pipeline run as exported from the CI provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for the run
    pub id: String,
    /// Repository path (e.g. `owner/repo`)
    pub repo: String,
    /// Branch the run was triggered on
    pub branch: String,
    /// Event that triggered the run (push, pull_request, ...)
    pub trigger: String,
    /// Person who triggered the run
    pub actor: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Jobs in execution order
    pub jobs: Vec<Job>,
}

impl Run {
    /// Total duration of the run: every job counts, missing durations count as zero.
    pub fn duration_sec(&self) -> f64 {
        self.jobs.iter().map(Job::duration_or_zero).sum()
    }

    /// A run is successful when every job either succeeded or was skipped.
    pub fn is_successful(&self) -> bool {
        self.jobs
            .iter()
            .all(|j| matches!(j.status, JobStatus::Success | JobStatus::Skipped))
    }

    pub fn has_failure(&self) -> bool {
        self.jobs.iter().any(|j| j.status == JobStatus::Failure)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub name: String,
    pub avg_duration_sec: f64,
}

/// Declared workflow of a repository. Reference data only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub repo: String,
    pub workflow: String,
    #[serde(default)]
    pub jobs: Vec<WorkflowJob>,
}

/// Free-text developer survey answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub author: String,
    pub team: String,
    pub comment: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub runs: Vec<Run>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WorkflowData {
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FeedbackData {
    #[serde(default)]
    pub feedback: Vec<FeedbackEntry>,
}

/// Everything a single analysis pass needs, fully materialized.
#[derive(Debug, Default)]
pub struct Dataset {
    pub runs: Vec<Run>,
    pub workflows: Vec<Workflow>,
    pub feedback: Vec<FeedbackEntry>,
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn job(status: JobStatus, duration: Option<f64>) -> Job {
        Job {
            name: "build".to_string(),
            status,
            duration_sec: duration,
            failure_message: None,
        }
    }

    fn run(jobs: Vec<Job>) -> Run {
        Run {
            id: "r1".to_string(),
            repo: "acme/api".to_string(),
            branch: "main".to_string(),
            trigger: "push".to_string(),
            actor: "alice".to_string(),
            started_at: "2024-03-01T10:00:00Z".parse().unwrap(),
            jobs,
        }
    }

    #[test]
    fn duration_counts_skipped_jobs_and_defaults_missing_to_zero() {
        let r = run(vec![
            job(JobStatus::Success, Some(30.0)),
            job(JobStatus::Skipped, Some(5.0)),
            job(JobStatus::Success, None),
        ]);
        assert_eq!(r.duration_sec(), 35.0);
    }

    #[test]
    fn skipped_jobs_do_not_break_success() {
        let r = run(vec![
            job(JobStatus::Success, Some(1.0)),
            job(JobStatus::Skipped, None),
        ]);
        assert!(r.is_successful());
        assert!(!r.has_failure());
    }

    #[test]
    fn any_failure_marks_run_failed() {
        let r = run(vec![
            job(JobStatus::Success, Some(1.0)),
            job(JobStatus::Failure, Some(2.0)),
        ]);
        assert!(!r.is_successful());
        assert!(r.has_failure());
    }

    #[test]
    fn deserializes_run_json() {
        let json = r#"{
            "id": "run-1",
            "repo": "acme/api",
            "branch": "main",
            "trigger": "push",
            "actor": "bob",
            "started_at": "2024-03-01T10:00:00Z",
            "jobs": [
                {"name": "lint", "status": "success", "duration_sec": 12},
                {"name": "test", "status": "failure", "duration_sec": 40.5, "failure_message": "boom"},
                {"name": "deploy", "status": "skipped"}
            ]
        }"#;
        let r: Run = serde_json::from_str(json).unwrap();
        assert_eq!(r.jobs.len(), 3);
        assert_eq!(r.jobs[1].status, JobStatus::Failure);
        assert_eq!(r.jobs[2].duration_sec, None);
        assert_eq!(r.duration_sec(), 52.5);
    }
}
