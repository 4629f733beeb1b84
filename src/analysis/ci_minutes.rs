use indexmap::IndexMap;

use super::{cmp_f64, round1};
use crate::history::Run;
use crate::insights::RepoMinutes;

#[derive(Default)]
struct MinuteTotals {
    total: f64,
    successful: f64,
    wasted: f64,
}

/// CI minutes consumed per repo, split into successful and wasted (runs with a failure).
pub fn analyze_ci_minutes(runs: &[Run]) -> Vec<RepoMinutes> {
    let mut by_repo: IndexMap<&str, MinuteTotals> = IndexMap::new();

    for run in runs {
        let minutes = run.duration_sec() / 60.0;
        let totals = by_repo.entry(run.repo.as_str()).or_default();
        totals.total += minutes;
        if run.has_failure() {
            totals.wasted += minutes;
        } else {
            totals.successful += minutes;
        }
    }

    let mut results: Vec<RepoMinutes> = by_repo
        .into_iter()
        .map(|(repo, totals)| RepoMinutes {
            repo: repo.to_string(),
            total_minutes: round1(totals.total),
            successful_minutes: round1(totals.successful),
            wasted_minutes: round1(totals.wasted),
            wasted_percent: if totals.total > 0.0 {
                round1(totals.wasted / totals.total * 100.0)
            } else {
                0.0
            },
        })
        .collect();

    results.sort_by(|a, b| cmp_f64(b.wasted_minutes, a.wasted_minutes));
    results
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{failed_job, job, run};
    use crate::history::JobStatus;

    #[test]
    fn splits_successful_and_wasted_minutes() {
        let runs = vec![
            run("1", "acme/api", "main", "a", 0, vec![job("t", JobStatus::Success, Some(180.0))]),
            run("2", "acme/api", "main", "a", 1, vec![failed_job("t", 60.0, "boom")]),
        ];

        let minutes = analyze_ci_minutes(&runs);

        assert_eq!(minutes.len(), 1);
        assert_eq!(minutes[0].total_minutes, 4.0);
        assert_eq!(minutes[0].successful_minutes, 3.0);
        assert_eq!(minutes[0].wasted_minutes, 1.0);
        assert_eq!(minutes[0].wasted_percent, 25.0);
    }

    #[test]
    fn repo_without_failures_wastes_nothing() {
        let runs = vec![
            run("1", "acme/clean", "main", "a", 0, vec![job("t", JobStatus::Success, Some(120.0))]),
            run("2", "acme/clean", "main", "a", 5, vec![job("t", JobStatus::Success, Some(60.0))]),
        ];

        let minutes = analyze_ci_minutes(&runs);

        assert_eq!(minutes[0].wasted_minutes, 0.0);
        assert_eq!(minutes[0].wasted_percent, 0.0);
    }

    #[test]
    fn zero_duration_repo_reports_zero_percent() {
        let runs = vec![run("1", "acme/api", "main", "a", 0, vec![failed_job("t", 0.0, "boom")])];

        assert_eq!(analyze_ci_minutes(&runs)[0].wasted_percent, 0.0);
    }

    #[test]
    fn sorts_by_wasted_minutes_descending() {
        let runs = vec![
            run("1", "acme/small", "main", "a", 0, vec![failed_job("t", 60.0, "x")]),
            run("2", "acme/big", "main", "a", 0, vec![failed_job("t", 600.0, "x")]),
        ];

        let minutes = analyze_ci_minutes(&runs);

        assert_eq!(minutes[0].repo, "acme/big");
        assert_eq!(minutes[1].repo, "acme/small");
    }
}
