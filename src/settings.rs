use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};

use crate::error::{DataPolicy, ScrapeError};

/// Optional settings file in the working directory, any format `config`
/// understands (`settings.yml`, `settings.toml`, ...).
const SETTINGS_FILE: &str = "settings";
const ENV_PREFIX: &str = "REVIEWS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Abort a target on bad data instead of skipping the block.
    pub data_strict: bool,
    pub browser_visible: bool,
    pub browser_logging: bool,
    pub rate_limit_delay_secs: f64,
    pub timeout_secs: u64,
    pub max_navigation_retries: u32,
    pub retry_backoff_ms: u64,
    pub dump_raw_data: bool,
    pub include_raw_fields: bool,
    /// Exit non-zero when any target failed.
    pub fail_on_target_error: bool,
    pub config_directory: PathBuf,
    pub output_directory: PathBuf,
    pub output_name_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_strict: true,
            browser_visible: false,
            browser_logging: false,
            rate_limit_delay_secs: 2.0,
            timeout_secs: 20,
            max_navigation_retries: 5,
            retry_backoff_ms: 1000,
            dump_raw_data: false,
            include_raw_fields: false,
            fail_on_target_error: false,
            config_directory: PathBuf::from("scrape_configs"),
            output_directory: PathBuf::from("output_files"),
            output_name_base: "result".into(),
        }
    }
}

impl Settings {
    /// Defaults, then `settings.*` if present, then `REVIEWS_*` env vars.
    pub fn load() -> Result<Self, ScrapeError> {
        Self::layered(File::with_name(SETTINGS_FILE).required(false))
    }

    fn layered<S>(file: S) -> Result<Self, ScrapeError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ScrapeError::Settings(e.to_string()))
    }

    pub fn policy(&self) -> DataPolicy {
        DataPolicy {
            strict: self.data_strict,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_limit(&self) -> Result<Duration, ScrapeError> {
        Duration::try_from_secs_f64(self.rate_limit_delay_secs.max(0.0)).map_err(|e| {
            ScrapeError::Settings(format!(
                "rate_limit_delay_secs {} is not a usable delay: {}",
                self.rate_limit_delay_secs, e
            ))
        })
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
