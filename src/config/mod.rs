// Required external crates for configuration management and serialization
use serde::Deserialize;
use std::path::PathBuf;
use config::{Config, ConfigError, Environment, File};
use crate::convert::Optimization;

/// Configuration for the asset tree conversions operate on
#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    /// Directory relative source and output paths resolve against
    pub directory: PathBuf,
}

/// One configured conversion job
#[derive(Debug, Deserialize, Clone)]
pub struct JobConfig {
    /// Short name used in console output and logs
    pub name: String,
    /// Saved model directory to convert
    pub source: PathBuf,
    /// Where the converted file is written
    pub output: PathBuf,
    /// Optional jobs report failures without failing the run
    #[serde(default)]
    pub optional: bool,
    /// Per-job optimization override
    pub optimization: Option<String>,
}

/// Configuration for the conversion pass
#[derive(Debug, Deserialize, Clone)]
pub struct ConversionConfig {
    /// Default optimization: none, default or float16
    pub optimization: String,
    /// Float32 weights below this element count are left unquantized
    pub min_quant_elements: usize,
    /// Conversions to run, in order
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Optional log file path
    pub file: Option<PathBuf>,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Asset-tree settings
    pub assets: AssetsConfig,
    /// Conversion settings
    pub conversion: ConversionConfig,
    /// Logging-related settings
    pub logging: LoggingConfig,
}

/// Implementation for loading and parsing configuration
impl Settings {
    /// Creates a new Settings instance by loading config from multiple sources
    /// in the following order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with MLPREP_
    /// 2. Local config file (local.toml) if present
    /// 3. Default config file (default.toml)
    pub fn new() -> Result<Self, ConfigError> {
        // Check if current directory exists
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(
                format!("Failed to get current directory: {}", e)
            ))?
            .join("config");

        // Check if config directory exists
        if !config_dir.exists() {
            return Err(ConfigError::Message(
                format!("Config directory not found at: {}", config_dir.display())
            ));
        }

        // Check if default.toml exists
        let default_config = config_dir.join("default.toml");
        if !default_config.exists() {
            return Err(ConfigError::Message(
                format!("Default configuration file not found at: {}", default_config.display())
            ));
        }

        // Create the local config path
        let local_config = config_dir.join("local.toml");

        // Convert paths to strings and keep them alive
        let default_config_path = default_config.to_string_lossy();
        let local_config_path = local_config.to_string_lossy();

        // Load and validate configuration
        let settings = Config::builder()
            .add_source(File::with_name(&default_config_path))
            .add_source(File::with_name(&local_config_path).required(false))
            .add_source(Environment::with_prefix("MLPREP").separator("_"))
            .build()?
            .try_deserialize::<Settings>()?;

        // Validate settings after loading
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        // Create assets directory if it doesn't exist
        if !self.assets.directory.exists() {
            std::fs::create_dir_all(&self.assets.directory).map_err(|e| {
                ConfigError::Message(format!(
                    "Failed to create assets directory at {}: {}",
                    self.assets.directory.display(), e
                ))
            })?;
        }

        // Validate the default optimization name
        if Optimization::parse(&self.conversion.optimization).is_none() {
            return Err(ConfigError::Message(
                format!("Invalid optimization: {}. Must be one of: none, default, float16",
                    self.conversion.optimization)
            ));
        }

        // Validate per-job optimization overrides
        for job in &self.conversion.jobs {
            if let Some(name) = &job.optimization {
                if Optimization::parse(name).is_none() {
                    return Err(ConfigError::Message(
                        format!("Invalid optimization for job {}: {}", job.name, name)
                    ));
                }
            }
        }

        // Validate min_quant_elements
        if self.conversion.min_quant_elements == 0 {
            return Err(ConfigError::Message(
                "min_quant_elements must be greater than 0".to_string()
            ));
        }

        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(
                format!("Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    self.logging.level)
            )),
        }?;

        // Create log file directory if configured and doesn't exist
        if let Some(log_file) = &self.logging.file {
            if let Some(parent) = log_file.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConfigError::Message(format!(
                            "Failed to create log directory at {}: {}",
                            parent.display(), e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }
}
