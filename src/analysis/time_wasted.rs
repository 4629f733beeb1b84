use indexmap::IndexMap;
use log::debug;

use super::{cmp_f64, round1};
use crate::history::Run;
use crate::insights::{RetryChain, TimeWastedSummary};

/// Detect retry chains and calculate the time they wasted.
///
/// Wasted CI time is the duration of the failed runs only; each failed run
/// additionally costs one context switch of `context_switch_penalty_min`.
#[allow(clippy::cast_precision_loss)]
pub fn analyze_time_wasted(runs: &[Run], context_switch_penalty_min: f64) -> TimeWastedSummary {
    let retry_chains = detect_retry_chains(runs);

    let mut total_wasted_sec = 0.0;
    let mut total_retries = 0usize;
    let mut waste_by_repo: IndexMap<String, f64> = IndexMap::new();

    for chain in &retry_chains {
        total_wasted_sec += chain.wasted_duration_sec;
        total_retries += chain.retry_count;
        *waste_by_repo.entry(chain.repo.clone()).or_insert(0.0) += chain.wasted_duration_sec / 60.0;
    }

    for minutes in waste_by_repo.values_mut() {
        *minutes = round1(*minutes);
    }

    let total_wasted_min = round1(total_wasted_sec / 60.0);
    let total_context_switch_min = total_retries as f64 * context_switch_penalty_min;

    debug!(
        "Found {} retry chains with {} retries",
        retry_chains.len(),
        total_retries
    );

    TimeWastedSummary {
        retry_chains,
        total_wasted_min,
        total_context_switch_min,
        total_combined_waste_min: total_wasted_min + total_context_switch_min,
        waste_by_repo,
    }
}

fn detect_retry_chains(runs: &[Run]) -> Vec<RetryChain> {
    let groups: IndexMap<(&str, &str, &str), Vec<&Run>> =
        runs.iter().fold(IndexMap::new(), |mut grouped, run| {
            grouped
                .entry((run.repo.as_str(), run.branch.as_str(), run.actor.as_str()))
                .or_default()
                .push(run);
            grouped
        });

    let mut chains: Vec<RetryChain> = groups
        .into_iter()
        .filter(|(_, group)| group.len() >= 2)
        .filter_map(|((repo, branch, actor), mut group)| {
            group.sort_by_key(|r| r.started_at);

            let failed: Vec<&Run> = group.iter().copied().filter(|r| r.has_failure()).collect();
            if failed.is_empty() {
                return None;
            }

            Some(RetryChain {
                repo: repo.to_string(),
                branch: branch.to_string(),
                actor: actor.to_string(),
                run_ids: group.iter().map(|r| r.id.clone()).collect(),
                failed_run_ids: failed.iter().map(|r| r.id.clone()).collect(),
                wasted_duration_sec: failed.iter().map(|r| r.duration_sec()).sum(),
                retry_count: failed.len(),
            })
        })
        .collect();

    chains.sort_by(|a, b| cmp_f64(b.wasted_duration_sec, a.wasted_duration_sec));
    chains
}
