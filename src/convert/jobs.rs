use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, error};
use crate::config::Settings;
use super::converter::{Converter, Optimization};

/// One conversion in an asset-preparation run
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Short name used in console output and logs
    pub name: String,
    /// Saved model directory to convert
    pub source: PathBuf,
    /// Where the converted file is written
    pub output: PathBuf,
    /// Optional jobs report failures without failing the run
    pub optional: bool,
    /// Optimization applied to this job
    pub optimization: Optimization,
}

/// Counts of what happened during a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub converted: usize,
    pub skipped: usize,
}

/// Build the job list from configuration.
///
/// Relative source and output paths are resolved against the assets
/// directory. Jobs run in the order they are configured.
pub fn jobs_from_settings(settings: &Settings) -> Result<Vec<ConversionJob>, Box<dyn Error + Send + Sync>> {
    let default_optimization = Optimization::parse(&settings.conversion.optimization)
        .ok_or_else(|| format!("Unknown optimization: {}", settings.conversion.optimization))?;

    let mut jobs = Vec::with_capacity(settings.conversion.jobs.len());
    for job in &settings.conversion.jobs {
        let optimization = match &job.optimization {
            Some(name) => Optimization::parse(name)
                .ok_or_else(|| format!("Unknown optimization for job {}: {}", job.name, name))?,
            None => default_optimization,
        };
        jobs.push(ConversionJob {
            name: job.name.clone(),
            source: resolve_path(&settings.assets.directory, &job.source),
            output: resolve_path(&settings.assets.directory, &job.output),
            optional: job.optional,
            optimization,
        });
    }

    Ok(jobs)
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Run conversion jobs in order.
///
/// A required job that fails terminates the run with its error. An optional
/// job that fails is reported and skipped; the run continues and still
/// succeeds.
pub fn run_jobs(jobs: &[ConversionJob], min_quant_elements: usize) -> Result<RunSummary, Box<dyn Error + Send + Sync>> {
    let mut summary = RunSummary::default();

    for job in jobs {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {wide_msg}")
                .unwrap()
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(format!("Converting {}...", job.name));

        match convert_job(job, min_quant_elements) {
            Ok(size) => {
                pb.finish_and_clear();
                println!("{}", format!("{} converted model saved at: {} ({:.2} MB)",
                        job.name, job.output.display(), size as f64 / (1024.0 * 1024.0)).green());
                summary.converted += 1;
            }
            Err(e) if job.optional => {
                pb.finish_and_clear();
                println!("{}", format!("{} conversion failed: {}. Ensure the saved model exists.",
                        job.name, e).yellow());
                error!("Optional job {} failed: {}", job.name, e);
                summary.skipped += 1;
            }
            Err(e) => {
                pb.finish_and_clear();
                error!("Job {} failed: {}", job.name, e);
                return Err(e);
            }
        }
    }

    info!("Conversion run finished: {} converted, {} skipped", summary.converted, summary.skipped);

    Ok(summary)
}

fn convert_job(job: &ConversionJob, min_quant_elements: usize) -> Result<u64, Box<dyn Error + Send + Sync>> {
    info!("Converting {} from {} with optimization {}",
          job.name, job.source.display(), job.optimization);

    let mut converter = Converter::from_saved_model(&job.source)?;
    converter.optimization = job.optimization;
    converter.min_quant_elements = min_quant_elements;

    let bytes = converter.convert()?;

    if let Some(parent) = job.output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&job.output, &bytes)?;

    info!("Wrote {} ({} bytes)", job.output.display(), bytes.len());

    Ok(bytes.len() as u64)
}
