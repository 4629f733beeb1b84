use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, highlight, toned, Tone};

/// Progress tracking for the load/analyze phases of a run
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_loading() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(highlight("Phase 1/2: Loading run history").to_string());
        Self { pb }
    }

    pub fn finish_loading_start_analysis(self, run_count: usize) -> Self {
        self.pb.finish_with_message(
            toned(format!("Phase 1/2: Loaded {run_count} runs ✓"), Tone::Good).to_string(),
        );
        let pb = create_spinner(highlight("Phase 2/2: Analyzing pipelines").to_string());
        Self { pb }
    }

    pub fn finish_analysis(self, issue_count: usize) {
        self.pb.finish_with_message(
            toned(
                format!("Phase 2/2: Found {issue_count} prioritized issues ✓"),
                Tone::Good,
            )
            .to_string(),
        );
        eprintln!();
    }

    pub fn abandon(self) {
        self.pb.abandon();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
