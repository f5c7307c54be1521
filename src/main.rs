use std::error::Error;
use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber;
use tracing_appender;
use tracing::info;

use mlprep::config::Settings;
use mlprep::convert::{jobs_from_settings, run_jobs, ConversionJob, Optimization};
use mlprep::interpreter::{display_model_summary, display_tensor_table, Interpreter};

#[derive(Parser)]
#[command(name = "mlprep", version, about = "Prepare machine-learning assets for mobile inference")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert saved models into quantized MLPK files
    Convert {
        /// Convert a single saved model directory instead of the configured jobs
        #[arg(long)]
        source: Option<PathBuf>,
        /// Output file when --source is given (defaults to <source>.mlpk)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Optimization to apply: none, default, float16
        #[arg(long)]
        optimization: Option<String>,
    },
    /// Load a converted model and print its input/output tensor descriptors
    Inspect {
        /// Path to the MLPK file
        model: PathBuf,
        /// Show every tensor, not just inputs and outputs
        #[arg(long)]
        tensors: bool,
        /// Decode the stored tensors to verify the payload
        #[arg(long)]
        verify: bool,
    },
}

/// Main entry point for the mlprep application
///
/// Parses command line arguments and handles two modes of operation:
/// - Convert: runs the configured conversion jobs, or a single ad-hoc one
/// - Inspect: loads a converted model and prints its tensor descriptors
///
/// # Errors
/// Returns an error if settings cannot be loaded, a required conversion
/// fails, or the inspected model cannot be read
fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    // Load settings first
    let settings = Settings::new()?;

    // Initialize the subscriber first, before any file operations
    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        // Use log file path from settings, or default to "logs"
        settings.logging.file.as_deref().unwrap_or_else(|| Path::new("logs")),
        "mlprep",
    );

    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        // Disable ANSI colors for cleaner log files
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_max_level(parse_level(&settings.logging.level))
        .init();

    info!("mlprep starting up");

    match cli.command {
        Commands::Convert { source, output, optimization } => {
            convert_command(&settings, source, output, optimization)
        }
        Commands::Inspect { model, tensors, verify } => {
            inspect_command(&model, tensors, verify)
        }
    }
}

fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

fn convert_command(
    settings: &Settings,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    optimization: Option<String>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let jobs = match source {
        Some(source) => {
            // Single ad-hoc conversion; always required
            let optimization = match optimization {
                Some(name) => Optimization::parse(&name)
                    .ok_or_else(|| format!("Unknown optimization: {}", name))?,
                None => Optimization::parse(&settings.conversion.optimization)
                    .ok_or_else(|| format!("Unknown optimization: {}", settings.conversion.optimization))?,
            };
            let output = output.unwrap_or_else(|| source.with_extension("mlpk"));
            let name = source.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "model".to_string());
            vec![ConversionJob { name, source, output, optional: false, optimization }]
        }
        None => jobs_from_settings(settings)?,
    };

    if jobs.is_empty() {
        println!("{}", "No conversion jobs configured".yellow());
        return Ok(());
    }

    let summary = run_jobs(&jobs, settings.conversion.min_quant_elements)?;
    println!("{}", format!("Done: {} converted, {} skipped", summary.converted, summary.skipped).bright_green());

    Ok(())
}

fn inspect_command(model: &Path, tensors: bool, verify: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut interpreter = Interpreter::new(model)?;
    interpreter.allocate_tensors()?;

    display_model_summary(&interpreter);
    display_tensor_table("Input", &interpreter.input_details()?);
    display_tensor_table("Output", &interpreter.output_details()?);

    if tensors {
        display_tensor_table("All tensors", &interpreter.tensor_details()?);
    }

    if verify {
        let verified = interpreter.verify_tensors()?;
        println!("\n{}", format!("Verified {} stored tensors", verified).bright_green());
    }

    Ok(())
}
