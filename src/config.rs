//! Runtime configuration.
//!
//! Values come from the process environment (after loading an optional `.env` file)
//! and fall back to the defaults below. The resulting `Config` is passed explicitly to
//! every component that needs it; CLI flags override individual fields afterwards.

use crate::error::{AppError, Result};
use crate::predictor::MAX_PREDICTION_DAYS;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.waqi.info";
pub const DEFAULT_PREDICTION_DAYS: i64 = 7;
pub const DEFAULT_GROWTH_RATE: f64 = 0.04;
pub const DEFAULT_COMPARISON_CITIES: [&str; 4] = ["Delhi", "Beijing", "New York", "London"];

#[derive(Debug, Clone)]
pub struct Config {
    /// WAQI API token. `None` makes every live fetch fail with an auth error.
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
    /// Extra attempts for transient failures only.
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub prediction_days: i64,
    pub growth_rate: f64,
    pub comparison_cities: Vec<String>,
    pub output_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub max_concurrent_fetches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            prediction_days: DEFAULT_PREDICTION_DAYS,
            growth_rate: DEFAULT_GROWTH_RATE,
            comparison_cities: DEFAULT_COMPARISON_CITIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            output_dir: PathBuf::from("."),
            log_dir: None,
            max_concurrent_fetches: 4,
        }
    }
}

impl Config {
    /// Builds the configuration from environment variables, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        config.api_key = get("WAQI_API_KEY");
        if let Some(url) = get("WAQI_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = parse_var::<u64>("AQI_REQUEST_TIMEOUT_SECS", get("AQI_REQUEST_TIMEOUT_SECS"))? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var("AQI_MAX_RETRIES", get("AQI_MAX_RETRIES"))? {
            config.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>("AQI_RETRY_BACKOFF_MS", get("AQI_RETRY_BACKOFF_MS"))? {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(days) = parse_var("AQI_PREDICTION_DAYS", get("AQI_PREDICTION_DAYS"))? {
            config.prediction_days = days;
        }
        if let Some(rate) = parse_var("AQI_GROWTH_RATE", get("AQI_GROWTH_RATE"))? {
            config.growth_rate = rate;
        }
        if let Some(cities) = get("AQI_COMPARISON_CITIES") {
            config.comparison_cities = cities
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(dir) = get("AQI_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config.log_dir = get("AQI_LOG_DIR").map(PathBuf::from);
        if let Some(n) = parse_var("AQI_MAX_CONCURRENT_FETCHES", get("AQI_MAX_CONCURRENT_FETCHES"))? {
            config.max_concurrent_fetches = n;
        }

        config.validate()?;
        debug!(
            "Loaded configuration (base_url: {}, api key set: {})",
            config.base_url,
            config.api_key.is_some()
        );
        Ok(config)
    }

    /// Replaces the API key when one is given on the command line.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.prediction_days <= 0 || self.prediction_days > MAX_PREDICTION_DAYS {
            return Err(AppError::Config(format!(
                "AQI_PREDICTION_DAYS must be between 1 and {}, got {}",
                MAX_PREDICTION_DAYS, self.prediction_days
            )));
        }
        if !self.growth_rate.is_finite() {
            return Err(AppError::Config("AQI_GROWTH_RATE must be finite".to_string()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(AppError::Config(
                "AQI_MAX_CONCURRENT_FETCHES must be at least 1".to_string(),
            ));
        }
        if reqwest::Url::parse(&self.base_url).is_err() {
            return Err(AppError::Config(format!(
                "WAQI_BASE_URL is not a valid URL: {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, v)))
        })
        .transpose()
}
