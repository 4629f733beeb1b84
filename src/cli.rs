use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::analysis::analyze;
use crate::config::{Config, OutputFormat};
use crate::history::load_dataset;
use crate::output::{export_report, print_summary, PhaseProgress};

#[derive(Parser)]
#[command(name = "cihealth")]
#[command(author, version, about = "CI Pipeline Health Analyzer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze exported CI run history
    Analyze {
        /// Run history file (JSON or YAML)
        #[arg(short, long, env = "CIHEALTH_RUNS")]
        runs: PathBuf,

        /// Workflow definitions file
        #[arg(short, long)]
        workflows: Option<PathBuf>,

        /// Developer feedback file
        #[arg(short = 'F', long)]
        feedback: Option<PathBuf>,

        /// Configuration file (defaults to cihealth.{toml,json,yaml,yml} in the working directory)
        #[arg(short, long, env = "CIHEALTH_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Write the default configuration to a file
    InitConfig {
        #[arg(default_value = "cihealth.toml")]
        path: PathBuf,
    },
}

impl Cli {
    fn execute_analyze(
        &self,
        runs: &Path,
        workflows: Option<&Path>,
        feedback: Option<&Path>,
        config_path: Option<&Path>,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let config = Config::load(config_path)?;
        let format = format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;

        info!("Analyzing run history from: {}", runs.display());

        let progress = PhaseProgress::start_loading();
        let dataset = match load_dataset(runs, workflows, feedback) {
            Ok(dataset) => dataset,
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };

        let progress = progress.finish_loading_start_analysis(dataset.runs.len());
        let report = match analyze(&dataset, &config.analysis) {
            Ok(report) => report,
            Err(e) => {
                progress.abandon();
                return Err(e.into());
            }
        };
        progress.finish_analysis(report.issues.len());

        match &self.output {
            Some(output_path) => {
                console::set_colors_enabled(false);
                let file = File::create(output_path).with_context(|| {
                    format!("Failed to create output file: {}", output_path.display())
                })?;
                let mut writer = BufWriter::new(file);
                export_report(&report, format, pretty, &mut writer)?;
                writer.flush()?;
                info!("Report written to: {}", output_path.display());
            }
            None if format == OutputFormat::Summary => print_summary(&report),
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                export_report(&report, format, pretty, &mut handle)?;
            }
        }

        Ok(())
    }

    fn execute_init_config(path: &Path) -> Result<()> {
        Config::default().save(path)?;
        info!("Default configuration written to: {}", path.display());
        eprintln!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    pub fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Analyze {
                runs,
                workflows,
                feedback,
                config,
                format,
            } => self.execute_analyze(
                runs,
                workflows.as_deref(),
                feedback.as_deref(),
                config.as_deref(),
                *format,
            ),
            Commands::InitConfig { path } => Self::execute_init_config(path),
        }
    }
}
