use log::debug;
use std::collections::HashSet;

use super::truncate_message;
use crate::config::CorrelationRule;
use crate::history::FeedbackEntry;
use crate::insights::{FailureRecord, FeedbackCorrelation, FlakyTest};

/// Evidence recorded when a comment matches nothing in the failure data.
pub const NO_MATCH_EVIDENCE: &str = "No direct match to failure data — qualitative feedback.";

const EVIDENCE_MESSAGE_CHARS: usize = 80;

/// Correlate developer feedback with evidence from flaky-test detection and
/// failure classification.
///
/// Output is one correlation per feedback entry, in input order, each with at
/// least one evidence line.
pub fn analyze_feedback(
    feedback: &[FeedbackEntry],
    failures: &[FailureRecord],
    flaky_tests: &[FlakyTest],
    rules: &[CorrelationRule],
) -> Vec<FeedbackCorrelation> {
    feedback
        .iter()
        .map(|entry| {
            let comment = entry.comment.to_lowercase();
            let mut evidence: Vec<String> = flaky_tests
                .iter()
                .filter(|flaky| rules.iter().any(|rule| rule.matches_flaky(&comment, flaky)))
                .map(flaky_evidence)
                .collect();

            let mut cited_runs: HashSet<&str> = HashSet::new();
            for failure in failures {
                if !rules.iter().any(|rule| rule.matches_failure(&comment, failure)) {
                    continue;
                }
                // One citation per run, even when several jobs of it match.
                if !cited_runs.insert(failure.run_id.as_str()) {
                    continue;
                }
                evidence.push(failure_evidence(failure));
            }

            if evidence.is_empty() {
                evidence.push(NO_MATCH_EVIDENCE.to_string());
            }

            debug!(
                "Feedback from {} matched {} evidence lines",
                entry.author,
                evidence.len()
            );

            FeedbackCorrelation {
                author: entry.author.clone(),
                team: entry.team.clone(),
                comment: entry.comment.clone(),
                evidence,
            }
        })
        .collect()
}

fn flaky_evidence(flaky: &FlakyTest) -> String {
    format!(
        "Flaky test \"{}\" in {}: {} failures across {} branches. Estimated {} min wasted.",
        flaky.test_pattern,
        flaky.repo,
        flaky.failure_count,
        flaky.branches.len(),
        flaky.estimated_waste_min
    )
}

fn failure_evidence(failure: &FailureRecord) -> String {
    format!(
        "{} {} failure in {}: \"{}\" [{}]",
        failure.repo,
        failure.job_name,
        failure.run_id,
        truncate_message(&failure.failure_message, EVIDENCE_MESSAGE_CHARS),
        failure.classification
    )
}

/// All keywords must occur in the (already lower-cased) comment. An empty
/// keyword list never matches.
fn keywords_present(comment: &str, keywords: &[String]) -> bool {
    !keywords.is_empty() && keywords.iter().all(|k| comment.contains(&k.to_lowercase()))
}

fn shared_term(comment: &str, target: &str, terms: &[String]) -> bool {
    let target = target.to_lowercase();
    terms.iter().any(|t| {
        let t = t.to_lowercase();
        !t.is_empty() && comment.contains(&t) && target.contains(&t)
    })
}

impl CorrelationRule {
    fn matches_flaky(&self, comment: &str, flaky: &FlakyTest) -> bool {
        match self {
            Self::FlakyPattern { keywords, contains } => {
                keywords_present(comment, keywords)
                    && flaky
                        .test_pattern
                        .to_lowercase()
                        .contains(&contains.to_lowercase())
            }
            Self::SharedTerm { terms } => shared_term(comment, &flaky.test_pattern, terms),
            Self::JobName { .. } | Self::FailureMessage { .. } => false,
        }
    }

    fn matches_failure(&self, comment: &str, failure: &FailureRecord) -> bool {
        match self {
            Self::JobName { keywords, equals } => {
                keywords_present(comment, keywords) && failure.job_name == *equals
            }
            Self::FailureMessage { keywords, contains } => {
                keywords_present(comment, keywords)
                    && failure
                        .failure_message
                        .to_lowercase()
                        .contains(&contains.to_lowercase())
            }
            Self::SharedTerm { terms } => shared_term(comment, &failure.failure_message, terms),
            Self::FlakyPattern { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::FailureClass;

    fn entry(comment: &str) -> FeedbackEntry {
        FeedbackEntry {
            author: "dana".to_string(),
            team: "growth".to_string(),
            comment: comment.to_string(),
        }
    }

    fn failure(run_id: &str, job_name: &str, message: &str) -> FailureRecord {
        FailureRecord {
            run_id: run_id.to_string(),
            repo: "acme/api".to_string(),
            branch: "main".to_string(),
            actor: "alice".to_string(),
            job_name: job_name.to_string(),
            failure_message: message.to_string(),
            classification: FailureClass::Hard,
            duration_sec: 10.0,
        }
    }

    fn flaky(pattern: &str) -> FlakyTest {
        FlakyTest {
            test_pattern: pattern.to_string(),
            repo: "acme/payments".to_string(),
            job_name: "integration-tests".to_string(),
            failure_count: 4,
            branches: vec!["main".to_string(), "dev".to_string()],
            actors: vec!["alice".to_string(), "bob".to_string()],
            failed_run_ids: vec![],
            retried_run_ids: vec![],
            estimated_waste_min: 64.5,
        }
    }

    fn rules() -> Vec<CorrelationRule> {
        crate::config::AnalysisConfig::default().correlation_rules
    }

    #[test]
    fn cites_flaky_test_for_payment_keyword() {
        let flakies = vec![flaky("tests/test_payment_gateway.py"), flaky("tests/other.py")];

        let result = analyze_feedback(
            &[entry("Stripe-mock keeps timing out in our integration runs")],
            &[],
            &flakies,
            &rules(),
        );

        assert_eq!(
            result[0].evidence,
            vec![
                "Flaky test \"tests/test_payment_gateway.py\" in acme/payments: 4 failures across 2 branches. Estimated 64.5 min wasted."
            ]
        );
    }

    #[test]
    fn cites_failure_by_job_name() {
        let failures = vec![
            failure("run-7", "e2e-tests", "AssertionError: button missing"),
            failure("run-8", "unit-tests", "AssertionError: 1 != 2"),
        ];

        let result = analyze_feedback(&[entry("The E2E suite is painful")], &failures, &[], &rules());

        assert_eq!(
            result[0].evidence,
            vec!["acme/api e2e-tests failure in run-7: \"AssertionError: button missing\" [hard]"]
        );
    }

    #[test]
    fn cites_each_run_only_once() {
        let failures = vec![
            failure("run-1", "e2e-tests", "first"),
            failure("run-1", "integration-tests", "second"),
        ];

        let result = analyze_feedback(
            &[entry("e2e and integration test runs both break")],
            &failures,
            &[],
            &rules(),
        );

        assert_eq!(result[0].evidence.len(), 1);
        assert!(result[0].evidence[0].contains("run-1"));
    }

    #[test]
    fn cites_runs_whose_ids_overlap() {
        let failures = vec![
            failure("run-10", "e2e-tests", "first"),
            failure("run-1", "e2e-tests", "second"),
        ];

        let result = analyze_feedback(&[entry("e2e")], &failures, &[], &rules());

        assert_eq!(result[0].evidence.len(), 2);
        assert!(result[0].evidence[0].contains("in run-10:"));
        assert!(result[0].evidence[1].contains("in run-1:"));
    }

    #[test]
    fn flaky_evidence_counts_do_not_hide_numeric_run_ids() {
        let failures = vec![failure("2", "e2e-tests", "AssertionError")];

        let result = analyze_feedback(
            &[entry("e2e payment checks")],
            &failures,
            &[flaky("tests/test_payment_gateway.py")],
            &rules(),
        );

        assert_eq!(result[0].evidence.len(), 2);
        assert!(result[0].evidence[1].starts_with("acme/api e2e-tests failure in 2:"));
    }

    #[test]
    fn shared_term_links_comment_to_message() {
        let failures = vec![failure("run-3", "unit-tests", "Receipt dedup produced two rows")];

        let result = analyze_feedback(
            &[entry("Duplicate receipt emails again")],
            &failures,
            &[],
            &rules(),
        );

        assert_eq!(result[0].evidence.len(), 1);
        assert!(result[0].evidence[0].starts_with("acme/api unit-tests failure in run-3"));
    }

    #[test]
    fn truncates_long_messages_in_evidence() {
        let long = format!("line one\n{}", "x".repeat(200));
        let failures = vec![failure("run-9", "e2e-tests", &long)];

        let result = analyze_feedback(&[entry("e2e")], &failures, &[], &rules());

        let evidence = &result[0].evidence[0];
        assert!(evidence.contains("line one x"));
        assert!(evidence.contains('…'));
        assert!(!evidence.contains('\n'));
    }

    #[test]
    fn falls_back_to_sentinel() {
        let result = analyze_feedback(
            &[entry("I wish builds had better logs")],
            &[failure("run-1", "e2e-tests", "boom")],
            &[flaky("tests/test_payment_gateway.py")],
            &rules(),
        );

        assert_eq!(result[0].evidence, vec![NO_MATCH_EVIDENCE]);
    }

    #[test]
    fn empty_rule_table_always_yields_sentinel() {
        let result = analyze_feedback(
            &[entry("e2e stripe receipt")],
            &[failure("run-1", "e2e-tests", "stripe receipt")],
            &[flaky("payment_gateway")],
            &[],
        );

        assert_eq!(result[0].evidence, vec![NO_MATCH_EVIDENCE]);
    }

    #[test]
    fn preserves_input_order_and_identity() {
        let feedback = vec![entry("first"), entry("second"), entry("third")];

        let result = analyze_feedback(&feedback, &[], &[], &rules());

        let comments: Vec<&str> = result.iter().map(|c| c.comment.as_str()).collect();
        assert_eq!(comments, vec!["first", "second", "third"]);
        assert!(result.iter().all(|c| !c.evidence.is_empty()));
        assert_eq!(result[0].author, "dana");
        assert_eq!(result[0].team, "growth");
    }

    #[cfg(test)]
    mod rule_matching {
        use super::*;

        #[test]
        fn multi_keyword_rule_requires_every_keyword() {
            let rule = CorrelationRule::FlakyPattern {
                keywords: vec!["volunteer".to_string(), "e2e".to_string()],
                contains: "volunteer-signup".to_string(),
            };
            let target = flaky("cypress/e2e/volunteer-signup.cy.ts");

            assert!(rule.matches_flaky("volunteer e2e flakes", &target));
            assert!(!rule.matches_flaky("volunteer page is slow", &target));
        }

        #[test]
        fn empty_keywords_never_match() {
            let rule = CorrelationRule::JobName {
                keywords: vec![],
                equals: "e2e-tests".to_string(),
            };

            assert!(!rule.matches_failure("anything", &failure("r", "e2e-tests", "x")));
        }

        #[test]
        fn failure_rules_do_not_match_flaky_tests() {
            let rule = CorrelationRule::FailureMessage {
                keywords: vec!["gateway".to_string()],
                contains: "gateway".to_string(),
            };

            assert!(!rule.matches_flaky("gateway", &flaky("payment_gateway")));
            assert!(rule.matches_failure("gateway", &failure("r", "j", "Gateway 502")));
        }
    }
}
