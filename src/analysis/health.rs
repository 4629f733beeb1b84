use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;

use crate::history::{JobStatus, Run, Workflow};
use crate::insights::RepoHealth;

/// Compute health metrics for each repository that has runs.
///
/// Duration of a run is the sum of all its job durations. The bottleneck is
/// the job with the highest mean duration over non-skipped, timed occurrences.
/// Workflow metadata is only used to cross-reference the workflow name.
pub fn analyze_health(runs: &[Run], workflows: &[Workflow]) -> Vec<RepoHealth> {
    let workflow_names: HashMap<&str, &str> = workflows
        .iter()
        .map(|w| (w.repo.as_str(), w.workflow.as_str()))
        .collect();

    group_runs_by_repo(runs)
        .into_iter()
        .map(|(repo, repo_runs)| {
            let workflow = workflow_names.get(repo).map(ToString::to_string);
            if workflow.is_none() {
                debug!("No workflow definition found for {repo}");
            }
            repo_health(repo, workflow, &repo_runs)
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn repo_health(repo: &str, workflow: Option<String>, runs: &[&Run]) -> RepoHealth {
    let durations: Vec<f64> = runs.iter().map(|r| r.duration_sec()).collect();
    let total_runs = runs.len();
    let success_count = runs.iter().filter(|r| r.is_successful()).count();

    let (avg_duration_sec, min_duration_sec, max_duration_sec) = if durations.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            durations.iter().sum::<f64>() / durations.len() as f64,
            durations.iter().copied().fold(f64::INFINITY, f64::min),
            durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    };

    let (bottleneck_job, bottleneck_avg_sec) = find_bottleneck(runs);

    RepoHealth {
        repo: repo.to_string(),
        workflow,
        total_runs,
        success_count,
        failure_count: total_runs - success_count,
        success_rate: if total_runs > 0 {
            success_count as f64 / total_runs as f64
        } else {
            0.0
        },
        avg_duration_sec,
        min_duration_sec,
        max_duration_sec,
        bottleneck_job,
        bottleneck_avg_sec: bottleneck_avg_sec.round(),
    }
}

/// Job with the highest mean duration; ties keep the first name encountered.
#[allow(clippy::cast_precision_loss)]
fn find_bottleneck(runs: &[&Run]) -> (String, f64) {
    let mut job_durations: IndexMap<&str, Vec<f64>> = IndexMap::new();
    for run in runs {
        for job in &run.jobs {
            if job.status == JobStatus::Skipped {
                continue;
            }
            if let Some(duration) = job.duration_sec {
                job_durations
                    .entry(job.name.as_str())
                    .or_default()
                    .push(duration);
            }
        }
    }

    let mut bottleneck = ("N/A".to_string(), 0.0);
    for (name, durations) in job_durations {
        let avg = durations.iter().sum::<f64>() / durations.len() as f64;
        if avg > bottleneck.1 {
            bottleneck = (name.to_string(), avg);
        }
    }
    bottleneck
}

fn group_runs_by_repo(runs: &[Run]) -> IndexMap<&str, Vec<&Run>> {
    runs.iter().fold(IndexMap::new(), |mut grouped, run| {
        grouped.entry(run.repo.as_str()).or_default().push(run);
        grouped
    })
}
