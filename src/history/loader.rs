use anyhow::{Context, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::path::Path;

use super::types::{Dataset, FeedbackData, RunData, WorkflowData};
use crate::error::CIHealthError;

/// Load a run history export plus optional workflow and feedback files.
///
/// Workflows and feedback are optional inputs; when a path is not given the
/// corresponding collection is empty.
pub fn load_dataset(
    runs_path: &Path,
    workflows_path: Option<&Path>,
    feedback_path: Option<&Path>,
) -> Result<Dataset> {
    let runs = load_document::<RunData>(runs_path)?.runs;
    let workflows = match workflows_path {
        Some(path) => load_document::<WorkflowData>(path)?.workflows,
        None => Vec::new(),
    };
    let feedback = match feedback_path {
        Some(path) => load_document::<FeedbackData>(path)?.feedback,
        None => Vec::new(),
    };

    info!(
        "Loaded {} runs, {} workflows, {} feedback entries",
        runs.len(),
        workflows.len(),
        feedback.len()
    );

    Ok(Dataset {
        runs,
        workflows,
        feedback,
    })
}

fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Reading {}", path.display());
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;

    parse_document(path, &contents)
        .with_context(|| format!("Failed to parse data file: {}", path.display()))
}

fn parse_document<T: DeserializeOwned>(path: &Path, contents: &str) -> crate::error::Result<T> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("json");

    match extension {
        "json" => Ok(serde_json::from_str(contents)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(contents)?),
        other => Err(CIHealthError::UnsupportedFormat(other.to_string())),
    }
}
