use std::fmt::Write;

use comfy_table::Cell;

use super::styling::{bright, cyan, dim, highlight, toned, Tone};
use super::tables::{
    category_cell, create_table, duration_cell, priority_cell, success_rate_cell,
    wasted_percent_cell,
};
use crate::analysis::NO_MATCH_EVIDENCE;
use crate::insights::AnalysisReport;

const TOP_ISSUES: usize = 10;

/// Prints a human-readable summary of the analysis to stdout.
///
/// Displays colour-coded tables for repository health, CI minutes, retry
/// waste, flaky tests and the prioritized issue list, followed by feedback
/// evidence.
pub fn print_summary(report: &AnalysisReport) {
    println!("{}", render_summary(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

#[allow(clippy::too_many_lines)]
pub fn render_summary(report: &AnalysisReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let waste = &report.time_wasted;
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Runs analyzed:"),
        highlight(report.total_runs),
        dim("Repositories:"),
        highlight(report.health.len()),
        dim("Failures classified:"),
        highlight(report.failures.len()),
        dim("Time wasted on retries:"),
        highlight(format!(
            "{} min CI + {} min context switches",
            waste.total_wasted_min, waste.total_context_switch_min
        )),
        dim("Analysis date:"),
        dim(report.generated_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if report.health.is_empty() {
        let _ = writeln!(output, "{}", highlight("No run data found."));
        return output;
    }

    add_section_header(&mut output, "🩺", "Pipeline Health");
    let mut health_table = create_table(&[
        "Repository",
        "Runs",
        "Success",
        "Avg Duration",
        "Bottleneck",
        "Bottleneck Avg",
    ]);
    for h in &report.health {
        health_table.add_row(vec![
            Cell::new(&h.repo),
            Cell::new(h.total_runs),
            success_rate_cell(h.success_rate),
            duration_cell(h.avg_duration_sec),
            Cell::new(&h.bottleneck_job),
            duration_cell(h.bottleneck_avg_sec),
        ]);
    }
    let _ = writeln!(output, "{health_table}\n");

    add_section_header(&mut output, "⏱️", "CI Minutes");
    let mut minutes_table = create_table(&["Repository", "Total", "Successful", "Wasted", "Wasted %"]);
    for m in &report.ci_minutes {
        minutes_table.add_row(vec![
            Cell::new(&m.repo),
            Cell::new(format!("{:.1}", m.total_minutes)),
            Cell::new(format!("{:.1}", m.successful_minutes)),
            Cell::new(format!("{:.1}", m.wasted_minutes)),
            wasted_percent_cell(m.wasted_percent),
        ]);
    }
    let _ = writeln!(output, "{minutes_table}\n");

    add_section_header(&mut output, "❄️", "Flaky Tests");
    if report.flaky_tests.is_empty() {
        let _ = writeln!(output, "  {}\n", toned("No flaky tests detected ✓", Tone::Good));
    } else {
        let mut flaky_table = create_table(&[
            "Test",
            "Repository",
            "Failures",
            "Branches",
            "Authors",
            "Waste (min)",
        ]);
        for f in &report.flaky_tests {
            flaky_table.add_row(vec![
                Cell::new(&f.test_pattern),
                Cell::new(&f.repo),
                Cell::new(f.failure_count),
                Cell::new(f.branches.len()),
                Cell::new(f.actors.len()),
                Cell::new(f.estimated_waste_min),
            ]);
        }
        let _ = writeln!(output, "{flaky_table}\n");
    }

    add_section_header(&mut output, "🔁", "Retry Chains");
    if waste.retry_chains.is_empty() {
        let _ = writeln!(output, "  {}\n", toned("No retry chains found ✓", Tone::Good));
    } else {
        let mut chain_table =
            create_table(&["Repository", "Branch", "Actor", "Runs", "Retries", "Wasted"]);
        for chain in &waste.retry_chains {
            chain_table.add_row(vec![
                Cell::new(&chain.repo),
                Cell::new(&chain.branch),
                Cell::new(&chain.actor),
                Cell::new(chain.run_ids.len()),
                Cell::new(chain.retry_count),
                duration_cell(chain.wasted_duration_sec),
            ]);
        }
        let _ = writeln!(output, "{chain_table}\n");
    }

    add_section_header(&mut output, "🎯", "Prioritized Issues");
    let mut issue_table = create_table(&["#", "Issue", "Category", "Freq", "Cost", "People", "Score"]);
    for (i, issue) in report.issues.iter().take(TOP_ISSUES).enumerate() {
        issue_table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&issue.title),
            category_cell(issue.category),
            Cell::new(issue.frequency_raw),
            Cell::new(issue.cost_raw),
            Cell::new(issue.blast_radius_raw),
            priority_cell(issue.priority_score),
        ]);
    }
    let _ = writeln!(output, "{issue_table}\n");

    if !report.feedback.is_empty() {
        add_section_header(&mut output, "💬", "Developer Feedback");
        for correlation in &report.feedback {
            let _ = writeln!(
                output,
                "  {} {}",
                cyan(format!("{} ({})", correlation.author, correlation.team)),
                dim(format!("\"{}\"", correlation.comment))
            );
            for evidence in &correlation.evidence {
                let line = if evidence == NO_MATCH_EVIDENCE {
                    dim(evidence)
                } else {
                    toned(evidence, Tone::Warn)
                };
                let _ = writeln!(output, "    • {line}");
            }
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::analysis::fixtures::{failed_job, job, run};
    use crate::config::AnalysisConfig;
    use crate::history::{Dataset, FeedbackEntry, JobStatus};

    fn report() -> AnalysisReport {
        let dataset = Dataset {
            runs: vec![
                run("r1", "acme/api", "main", "alice", 0, vec![failed_job("e2e-tests", 200.0, "FAIL a.spec.ts > TimeoutError")]),
                run("r2", "acme/api", "dev", "bob", 1, vec![failed_job("e2e-tests", 200.0, "FAIL a.spec.ts > TimeoutError")]),
                run("r3", "acme/api", "main", "alice", 2, vec![job("e2e-tests", JobStatus::Success, Some(200.0))]),
            ],
            workflows: vec![],
            feedback: vec![FeedbackEntry {
                author: "dana".to_string(),
                team: "growth".to_string(),
                comment: "nothing to do with tests".to_string(),
            }],
        };
        analyze(&dataset, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn renders_every_section() {
        console::set_colors_enabled(false);
        let rendered = render_summary(&report());

        for section in [
            "Overview",
            "Pipeline Health",
            "CI Minutes",
            "Flaky Tests",
            "Retry Chains",
            "Prioritized Issues",
            "Developer Feedback",
        ] {
            assert!(rendered.contains(section), "missing section {section}");
        }
        assert!(rendered.contains("a.spec.ts"));
        assert!(rendered.contains(NO_MATCH_EVIDENCE));
    }

    #[test]
    fn empty_report_stops_after_overview() {
        console::set_colors_enabled(false);
        let empty = analyze(&Dataset::default(), &AnalysisConfig::default()).unwrap();

        let rendered = render_summary(&empty);

        assert!(rendered.contains("No run data found."));
        assert!(!rendered.contains("Pipeline Health"));
    }
}
