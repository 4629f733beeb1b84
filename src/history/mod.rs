mod loader;
mod types;

pub use loader::load_dataset;
pub use types::{Dataset, FeedbackEntry, Job, JobStatus, Run, Workflow};
