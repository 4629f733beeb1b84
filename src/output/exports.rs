use anyhow::Result;
use std::io::Write;

use super::summary::render_summary;
use crate::analysis::format_duration;
use crate::config::OutputFormat;
use crate::insights::{AnalysisReport, FailureClass};

/// Writes the analysis report in the requested format.
///
/// - Summary: colour-coded terminal tables
/// - JSON: the full report, for programmatic access
/// - Markdown: a self-contained report for wikis and pull requests
pub fn export_report(
    report: &AnalysisReport,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            writeln!(output, "{}", render_summary(report))?;
            Ok(())
        }
        OutputFormat::Json => export_json(report, pretty, output),
        OutputFormat::Markdown => export_markdown(report, output),
    }
}

fn export_json(report: &AnalysisReport, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}

#[allow(clippy::too_many_lines)]
fn export_markdown(report: &AnalysisReport, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "# CI Pipeline Health Report")?;
    writeln!(output)?;
    writeln!(output, "Generated: {}", report.generated_at.to_rfc3339())?;
    writeln!(output)?;

    writeln!(output, "## Pipeline Health Summary")?;
    writeln!(output)?;
    writeln!(
        output,
        "| Repository | Runs | Success Rate | Avg Duration | Min | Max | Bottleneck Job | Bottleneck Avg |"
    )?;
    writeln!(output, "|---|---|---|---|---|---|---|---|")?;
    for h in &report.health {
        writeln!(
            output,
            "| {} | {} | {:.1}% | {} | {} | {} | {} | {} |",
            cell(&h.repo),
            h.total_runs,
            h.success_rate * 100.0,
            format_duration(h.avg_duration_sec),
            format_duration(h.min_duration_sec),
            format_duration(h.max_duration_sec),
            cell(&h.bottleneck_job),
            format_duration(h.bottleneck_avg_sec)
        )?;
    }
    writeln!(output)?;

    writeln!(output, "## CI Minutes")?;
    writeln!(output)?;
    writeln!(output, "| Repository | Total | Successful | Wasted | Wasted % |")?;
    writeln!(output, "|---|---|---|---|---|")?;
    for m in &report.ci_minutes {
        writeln!(
            output,
            "| {} | {:.1} | {:.1} | {:.1} | {:.1}% |",
            cell(&m.repo),
            m.total_minutes,
            m.successful_minutes,
            m.wasted_minutes,
            m.wasted_percent
        )?;
    }
    writeln!(output)?;

    let waste = &report.time_wasted;
    writeln!(output, "## Time Wasted on Retries")?;
    writeln!(output)?;
    writeln!(output, "- CI time in failed runs: {} min", waste.total_wasted_min)?;
    writeln!(
        output,
        "- Context switches: {} min",
        waste.total_context_switch_min
    )?;
    writeln!(
        output,
        "- Combined: **{} min**",
        waste.total_combined_waste_min
    )?;
    for (repo, minutes) in &waste.waste_by_repo {
        writeln!(output, "  - {repo}: {minutes} min")?;
    }
    writeln!(output)?;

    writeln!(output, "## Flaky Test Detection")?;
    writeln!(output)?;
    if report.flaky_tests.is_empty() {
        writeln!(output, "No flaky tests detected.")?;
    } else {
        writeln!(
            output,
            "| Test | Repository | Job | Failures | Branches | Authors | Retried | Est. Waste |"
        )?;
        writeln!(output, "|---|---|---|---|---|---|---|---|")?;
        for f in &report.flaky_tests {
            writeln!(
                output,
                "| `{}` | {} | {} | {} | {} | {} | {} | {} min |",
                cell(&f.test_pattern),
                cell(&f.repo),
                cell(&f.job_name),
                f.failure_count,
                f.branches.len(),
                f.actors.len(),
                f.retried_run_ids.len(),
                f.estimated_waste_min
            )?;
        }
    }
    writeln!(output)?;

    let ephemeral = report
        .failures
        .iter()
        .filter(|f| f.classification == FailureClass::Ephemeral)
        .count();
    writeln!(output, "## Failure Classification")?;
    writeln!(output)?;
    writeln!(
        output,
        "{} failures: {} ephemeral, {} hard.",
        report.failures.len(),
        ephemeral,
        report.failures.len() - ephemeral
    )?;
    writeln!(output)?;

    if !report.feedback.is_empty() {
        writeln!(output, "## Developer Feedback")?;
        writeln!(output)?;
        for correlation in &report.feedback {
            writeln!(
                output,
                "> \"{}\" ({}, {})",
                correlation.comment, correlation.author, correlation.team
            )?;
            writeln!(output)?;
            for evidence in &correlation.evidence {
                writeln!(output, "- {evidence}")?;
            }
            writeln!(output)?;
        }
    }

    writeln!(output, "## Improvement Recommendations")?;
    writeln!(output)?;
    if report.issues.is_empty() {
        writeln!(output, "No issues found.")?;
    }
    for (i, issue) in report.issues.iter().enumerate() {
        writeln!(
            output,
            "### {}. {} (score {:.2})",
            i + 1,
            issue.title,
            issue.priority_score
        )?;
        writeln!(output)?;
        writeln!(
            output,
            "- Category: {} | Repository: {}",
            issue.category, issue.repo
        )?;
        writeln!(
            output,
            "- Frequency: {} ({:.2}) | Cost: {} min ({:.2}) | People affected: {} ({:.2})",
            issue.frequency_raw,
            issue.frequency_score,
            issue.cost_raw,
            issue.cost_score,
            issue.blast_radius_raw,
            issue.blast_radius_score
        )?;
        if let Some(flag) = &issue.flag {
            writeln!(output, "- ⚠️ {flag}")?;
        }
        writeln!(output)?;
        writeln!(output, "{}", issue.detail)?;
        writeln!(output)?;
    }

    Ok(())
}
