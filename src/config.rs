use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_LPN_PREFIX: &str = "LPN";
const DEFAULT_MAX_VOLUMES_PER_CONFERENCE: u32 = 500;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Application configuration
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Environment name (development, staging, production)
    #[validate(length(min = 1))]
    pub environment: String,

    /// Host address to bind the HTTP server
    #[validate(length(min = 1))]
    pub host: String,

    /// Port to bind the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Initial value of the blind conference switch
    #[serde(default = "default_true_bool")]
    pub blind_conference: bool,

    /// Absolute units a line may differ from expected without diverging
    #[serde(default)]
    pub divergence_tolerance: u32,

    /// Prefix of issued volume codes
    #[serde(default = "default_lpn_prefix")]
    #[validate(custom = "validate_lpn_prefix")]
    pub lpn_prefix: String,

    /// First sequence number handed to the volume issuer
    #[serde(default = "default_lpn_start_sequence")]
    #[validate(range(max = 99_999_999_999))]
    pub lpn_start_sequence: u64,

    /// Upper bound on volumes a single conference call may create
    #[serde(default = "default_max_volumes_per_conference")]
    #[validate(range(min = 1, max = 10_000))]
    pub max_volumes_per_conference: u32,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// JSON file with locations and products for the in-memory collaborators
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true_bool() -> bool {
    true
}

fn default_lpn_prefix() -> String {
    DEFAULT_LPN_PREFIX.to_string()
}

fn default_lpn_start_sequence() -> u64 {
    1
}

fn default_max_volumes_per_conference() -> u32 {
    DEFAULT_MAX_VOLUMES_PER_CONFERENCE
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_lpn_prefix(prefix: &str) -> Result<(), ValidationError> {
    let well_formed = (1..=6).contains(&prefix.len())
        && prefix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && prefix.chars().any(|c| c.is_ascii_uppercase());
    if well_formed {
        Ok(())
    } else {
        let mut err = ValidationError::new("lpn_prefix");
        err.message = Some(
            "lpn_prefix must be 1-6 uppercase letters or digits with at least one letter".into(),
        );
        Err(err)
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("stateset_receiving={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    let filter = EnvFilter::new(filter_directive);

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Same layering as [`load_config`], reading files from `config_dir`.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn defaults_apply_without_files() {
        let dir = config_dir(&[]);
        let config = load_config_from(dir.path(), "test").unwrap();

        assert_eq!(config.environment, "test");
        assert_eq!(config.port, 8080);
        assert!(config.blind_conference);
        assert_eq!(config.divergence_tolerance, 0);
        assert_eq!(config.lpn_prefix, "LPN");
        assert_eq!(config.lpn_start_sequence, 1);
        assert_eq!(config.max_volumes_per_conference, 500);
        assert_eq!(config.event_channel_capacity, 1024);
        assert!(config.seed_file.is_none());
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let dir = config_dir(&[
            (
                "default.toml",
                "port = 9000\nblind_conference = false\nlpn_prefix = \"VOL\"\n",
            ),
            ("staging.toml", "port = 9100\ndivergence_tolerance = 2\n"),
        ]);
        let config = load_config_from(dir.path(), "staging").unwrap();

        assert_eq!(config.port, 9100);
        assert!(!config.blind_conference);
        assert_eq!(config.lpn_prefix, "VOL");
        assert_eq!(config.divergence_tolerance, 2);
        assert_eq!(config.bind_address(), "0.0.0.0:9100");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = config_dir(&[(
            "default.toml",
            "log_level = \"loud\"\nlpn_prefix = \"lpn-x\"\nmax_volumes_per_conference = 0\n",
        )]);
        let result = load_config_from(dir.path(), "test");

        match result {
            Err(AppConfigError::Validation(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("log_level"));
                assert!(fields.contains_key("lpn_prefix"));
                assert!(fields.contains_key("max_volumes_per_conference"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn lpn_prefix_rules() {
        assert!(validate_lpn_prefix("LPN").is_ok());
        assert!(validate_lpn_prefix("RC01").is_ok());
        assert!(validate_lpn_prefix("").is_err());
        assert!(validate_lpn_prefix("TOOLONG").is_err());
        assert!(validate_lpn_prefix("lpn").is_err());
        // digits alone would run into the sequence number
        assert!(validate_lpn_prefix("123").is_err());
    }

    #[test]
    fn event_channel_needs_capacity() {
        assert!(validate_event_channel_capacity(0).is_err());
        assert!(validate_event_channel_capacity(1).is_ok());
    }
}
