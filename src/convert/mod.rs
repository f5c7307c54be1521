mod converter;
mod jobs;
pub mod quant;

// Re-export from converter
pub use converter::{Converter, Optimization};
// Re-export from jobs
pub use jobs::{jobs_from_settings, run_jobs, ConversionJob, RunSummary};
