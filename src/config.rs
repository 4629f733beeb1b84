use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CIHealthError;

/// Configuration file structure for cihealth.
///
/// Holds the tunable analysis policy (penalties, thresholds, weights and the
/// feedback correlation table) plus output preferences. Configuration files are
/// loaded from the current directory or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Analysis parameters
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Minutes of developer time lost each time a failure forces a context switch
    #[serde(default = "default_context_switch_penalty_min")]
    pub context_switch_penalty_min: f64,

    /// Bottleneck jobs averaging at least this many seconds are flagged as slow
    #[serde(default = "default_slow_pipeline_threshold_sec")]
    pub slow_pipeline_threshold_sec: f64,

    /// Runs longer than this many seconds are assumed to make a developer switch tasks
    #[serde(default = "default_context_switch_wait_threshold_sec")]
    pub context_switch_wait_threshold_sec: f64,

    /// Weights of the three prioritization dimensions
    #[serde(default)]
    pub weights: PriorityWeights,

    /// Feedback-driven workflow issue detection
    #[serde(default)]
    pub workflow: WorkflowRuleConfig,

    /// Keyword table used to link feedback comments to failure data
    #[serde(default = "default_correlation_rules")]
    pub correlation_rules: Vec<CorrelationRule>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PriorityWeights {
    #[serde(default = "default_weight_frequency")]
    pub frequency: f64,
    #[serde(default = "default_weight_cost")]
    pub cost: f64,
    #[serde(default = "default_weight_blast_radius")]
    pub blast_radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkflowRuleConfig {
    /// Regex (case-insensitive) that marks a comment as "runs the full suite on every change"
    #[serde(default = "default_full_suite_pattern")]
    pub comment_pattern: String,

    /// Substring identifying the repository the workflow issue is about
    #[serde(default = "default_workflow_repo")]
    pub repo: String,

    /// Job that runs the suite in question
    #[serde(default = "default_suite_job")]
    pub suite_job: String,

    /// Short name of the suite used in report titles (e.g. "e2e")
    #[serde(default = "default_suite_label")]
    pub suite_label: String,

    /// Suite duration to assume when the bottleneck is some other job
    #[serde(default = "default_suite_fallback_min")]
    pub fallback_suite_min: f64,
}

/// One row of the feedback correlation table.
///
/// Every rule requires all of its `keywords` to appear in the lower-cased
/// comment, then checks its target against flaky tests and/or failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "kebab-case")]
pub enum CorrelationRule {
    /// Flaky test whose signature contains `contains`
    FlakyPattern {
        keywords: Vec<String>,
        contains: String,
    },
    /// Failure whose job is named exactly `equals`
    JobName {
        keywords: Vec<String>,
        equals: String,
    },
    /// Failure whose message contains `contains`
    FailureMessage {
        keywords: Vec<String>,
        contains: String,
    },
    /// Any of `terms` found both in the comment and in a flaky signature or failure message
    SharedTerm { terms: Vec<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Markdown,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            context_switch_penalty_min: default_context_switch_penalty_min(),
            slow_pipeline_threshold_sec: default_slow_pipeline_threshold_sec(),
            context_switch_wait_threshold_sec: default_context_switch_wait_threshold_sec(),
            weights: PriorityWeights::default(),
            workflow: WorkflowRuleConfig::default(),
            correlation_rules: default_correlation_rules(),
        }
    }
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            frequency: default_weight_frequency(),
            cost: default_weight_cost(),
            blast_radius: default_weight_blast_radius(),
        }
    }
}

impl PriorityWeights {
    /// Rescale so the weights sum to 1, keeping composite scores in `[0, 1]`.
    ///
    /// Callers validate first; an all-zero set is returned unchanged.
    pub fn normalized(self) -> Self {
        let total = self.frequency + self.cost + self.blast_radius;
        if total <= 0.0 {
            return self;
        }
        Self {
            frequency: self.frequency / total,
            cost: self.cost / total,
            blast_radius: self.blast_radius / total,
        }
    }
}

impl Default for WorkflowRuleConfig {
    fn default() -> Self {
        Self {
            comment_pattern: default_full_suite_pattern(),
            repo: default_workflow_repo(),
            suite_job: default_suite_job(),
            suite_label: default_suite_label(),
            fallback_suite_min: default_suite_fallback_min(),
        }
    }
}

fn default_context_switch_penalty_min() -> f64 {
    15.0
}

fn default_slow_pipeline_threshold_sec() -> f64 {
    120.0
}

fn default_context_switch_wait_threshold_sec() -> f64 {
    300.0
}

fn default_weight_frequency() -> f64 {
    0.35
}

fn default_weight_cost() -> f64 {
    0.40
}

fn default_weight_blast_radius() -> f64 {
    0.25
}

fn default_full_suite_pattern() -> String {
    "full (e2e|test) suite|every PR".to_string()
}

fn default_workflow_repo() -> String {
    "volunteer-portal".to_string()
}

fn default_suite_job() -> String {
    "e2e-tests".to_string()
}

fn default_suite_label() -> String {
    "e2e".to_string()
}

fn default_suite_fallback_min() -> f64 {
    3.0
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(ToString::to_string).collect()
}

fn default_correlation_rules() -> Vec<CorrelationRule> {
    vec![
        CorrelationRule::FlakyPattern {
            keywords: keywords(&["stripe"]),
            contains: "payment_gateway".to_string(),
        },
        CorrelationRule::FlakyPattern {
            keywords: keywords(&["payment"]),
            contains: "payment_gateway".to_string(),
        },
        CorrelationRule::FlakyPattern {
            keywords: keywords(&["volunteer", "e2e"]),
            contains: "volunteer-signup".to_string(),
        },
        CorrelationRule::JobName {
            keywords: keywords(&["integration test"]),
            equals: "integration-tests".to_string(),
        },
        CorrelationRule::JobName {
            keywords: keywords(&["e2e"]),
            equals: "e2e-tests".to_string(),
        },
        CorrelationRule::SharedTerm {
            terms: keywords(&["stripe", "receipt", "volunteer-signup"]),
        },
    ]
}

impl AnalysisConfig {
    /// Reject policies that would produce meaningless scores.
    pub fn validate(&self) -> crate::error::Result<()> {
        let w = &self.weights;
        for (name, value) in [
            ("weights.frequency", w.frequency),
            ("weights.cost", w.cost),
            ("weights.blast-radius", w.blast_radius),
            ("context-switch-penalty-min", self.context_switch_penalty_min),
            ("slow-pipeline-threshold-sec", self.slow_pipeline_threshold_sec),
            (
                "context-switch-wait-threshold-sec",
                self.context_switch_wait_threshold_sec,
            ),
            ("workflow.fallback-suite-min", self.workflow.fallback_suite_min),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CIHealthError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if w.frequency + w.cost + w.blast_radius <= 0.0 {
            return Err(CIHealthError::Config(
                "at least one prioritization weight must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cihealth.toml
    /// 3. ./cihealth.json
    /// 4. ./cihealth.yaml
    /// 5. ./cihealth.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "cihealth.toml",
            "cihealth.json",
            "cihealth.yaml",
            "cihealth.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        config
            .analysis
            .validate()
            .with_context(|| format!("Invalid analysis settings in {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.context_switch_penalty_min, 15.0);
        assert_eq!(config.analysis.slow_pipeline_threshold_sec, 120.0);
        assert_eq!(config.analysis.context_switch_wait_threshold_sec, 300.0);
        assert_eq!(config.analysis.weights.frequency, 0.35);
        assert_eq!(config.analysis.weights.cost, 0.40);
        assert_eq!(config.analysis.weights.blast_radius, 0.25);
        assert!(!config.analysis.correlation_rules.is_empty());
        assert_eq!(config.output.format, OutputFormat::Summary);
        assert!(config.analysis.validate().is_ok());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[analysis]
context-switch-penalty-min = 10
slow-pipeline-threshold-sec = 90.0

[analysis.weights]
frequency = 0.5
cost = 0.3
blast-radius = 0.2

[analysis.workflow]
repo = "web-app"
suite-job = "cypress"

[[analysis.correlation-rules]]
match = "job-name"
keywords = ["lint"]
equals = "eslint"

[output]
format = "markdown"
"#;
        write!(temp_file, "{toml_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.analysis.context_switch_penalty_min, 10.0);
        assert_eq!(config.analysis.slow_pipeline_threshold_sec, 90.0);
        assert_eq!(config.analysis.context_switch_wait_threshold_sec, 300.0);
        assert_eq!(config.analysis.weights.frequency, 0.5);
        assert_eq!(config.analysis.workflow.repo, "web-app");
        assert_eq!(config.analysis.workflow.fallback_suite_min, 3.0);
        assert_eq!(config.analysis.workflow.suite_label, "e2e");
        assert_eq!(
            config.analysis.correlation_rules,
            vec![CorrelationRule::JobName {
                keywords: vec!["lint".to_string()],
                equals: "eslint".to_string(),
            }]
        );
        assert_eq!(config.output.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "analysis": {
    "context-switch-penalty-min": 20,
    "correlation-rules": [
      {"match": "shared-term", "terms": ["checkout"]}
    ]
  },
  "output": {
    "format": "json",
    "pretty": true
  }
}"#;
        write!(temp_file, "{json_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.analysis.context_switch_penalty_min, 20.0);
        assert_eq!(
            config.analysis.correlation_rules,
            vec![CorrelationRule::SharedTerm {
                terms: vec!["checkout".to_string()]
            }]
        );
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(
            temp_file,
            "analysis:\n  context-switch-wait-threshold-sec: 600\n"
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.analysis.context_switch_wait_threshold_sec, 600.0);
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "[analysis.weights]\ncost = -1.0\n").unwrap();

        let err = Config::load_from_path(temp_file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("weights.cost"));
    }

    #[test]
    fn test_rejects_all_zero_weights() {
        let mut config = AnalysisConfig::default();
        config.weights = PriorityWeights {
            frequency: 0.0,
            cost: 0.0,
            blast_radius: 0.0,
        };
        assert!(matches!(config.validate(), Err(CIHealthError::Config(_))));
    }

    #[test]
    fn test_normalized_weights_sum_to_one() {
        let weights = PriorityWeights {
            frequency: 1.0,
            cost: 2.0,
            blast_radius: 1.0,
        }
        .normalized();

        assert_eq!(weights.frequency, 0.25);
        assert_eq!(weights.cost, 0.5);
        assert_eq!(weights.blast_radius, 0.25);
    }

    #[test]
    fn test_normalized_keeps_default_weights() {
        let weights = PriorityWeights::default().normalized();
        let sum = weights.frequency + weights.cost + weights.blast_radius;

        assert!((sum - 1.0).abs() < 1e-9);
        assert!((weights.cost - 0.40).abs() < 1e-9);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("nonexistent-cihealth.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cihealth.toml");

        let mut config = Config::default();
        config.analysis.context_switch_penalty_min = 7.5;
        config.output.format = OutputFormat::Json;
        config.save(&path).unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.analysis.context_switch_penalty_min, 7.5);
        assert_eq!(reloaded.output.format, OutputFormat::Json);
        assert_eq!(
            reloaded.analysis.correlation_rules,
            config.analysis.correlation_rules
        );
    }
}
