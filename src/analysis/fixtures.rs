//! Builders for run history used across the analyzer tests.

use chrono::{DateTime, Duration, Utc};

use crate::history::{Job, JobStatus, Run};

fn base_time() -> DateTime<Utc> {
    "2024-03-01T09:00:00Z".parse().unwrap()
}

pub fn job(name: &str, status: JobStatus, duration: Option<f64>) -> Job {
    Job {
        name: name.to_string(),
        status,
        duration_sec: duration,
        failure_message: None,
    }
}

pub fn failed_job(name: &str, duration: f64, message: &str) -> Job {
    Job {
        name: name.to_string(),
        status: JobStatus::Failure,
        duration_sec: Some(duration),
        failure_message: Some(message.to_string()),
    }
}

/// A run starting `minutes` after a fixed base time.
pub fn run(id: &str, repo: &str, branch: &str, actor: &str, minutes: i64, jobs: Vec<Job>) -> Run {
    Run {
        id: id.to_string(),
        repo: repo.to_string(),
        branch: branch.to_string(),
        trigger: "push".to_string(),
        actor: actor.to_string(),
        started_at: base_time() + Duration::minutes(minutes),
        jobs,
    }
}
