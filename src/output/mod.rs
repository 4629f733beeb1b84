mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_report;
pub use progress::PhaseProgress;
use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the `cihealth` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🩺 cihealth"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI run history triage")
    );
}
