use super::{display, interactive};
use crate::api::{AqiSource, MockAqiSource, WaqiClient};
use crate::app::AqiApp;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::predictor::{Predictor, MAX_PREDICTION_DAYS};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::info;

/// Seed for the offline demo readings and forecast noise.
const DEMO_SEED: u64 = 42;

/// Air quality monitoring and prediction system
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run in interactive mode
    #[arg(short, long)]
    pub interactive: bool,

    /// City name to analyze
    #[arg(short, long)]
    pub city: Option<String>,

    /// Multiple cities to compare
    #[arg(long, num_args = 1..)]
    pub cities: Option<Vec<String>>,

    /// Save plots as PNG files instead of only rendering them
    #[arg(short, long)]
    pub save_plots: bool,

    /// WAQI API key (overrides WAQI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Number of days to predict, 1 to 365 (default: AQI_PREDICTION_DAYS or 7)
    #[arg(short, long, allow_negative_numbers = true)]
    pub days: Option<i64>,

    /// Directory for saved plots (overrides AQI_OUTPUT_DIR)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Use built-in offline readings instead of the WAQI API
    #[arg(long)]
    pub demo: bool,
}

/// What a parsed command line asks the application to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    SingleCity(String),
    MultiCity(Vec<String>),
}

impl Cli {
    /// `--interactive` wins, then `--cities`, then `--city`; with none of them the
    /// prompt loop runs.
    pub fn mode(&self) -> Mode {
        if self.interactive {
            return Mode::Interactive;
        }
        match (&self.cities, &self.city) {
            (Some(cities), _) => Mode::MultiCity(cities.clone()),
            (None, Some(city)) => Mode::SingleCity(city.clone()),
            (None, None) => Mode::Interactive,
        }
    }

    /// Rejects arguments clap accepts but the application cannot use.
    pub fn validate(&self) -> Result<()> {
        if let Some(days) = self.days {
            if days <= 0 || days > MAX_PREDICTION_DAYS {
                return Err(AppError::InvalidArgument(format!(
                    "--days must be between 1 and {}, got {}",
                    MAX_PREDICTION_DAYS, days
                )));
            }
        }
        if matches!(&self.city, Some(city) if city.trim().is_empty()) {
            return Err(AppError::InvalidArgument(
                "--city must not be empty".to_string(),
            ));
        }
        if let Some(cities) = &self.cities {
            if cities.iter().any(|c| c.trim().is_empty()) {
                return Err(AppError::InvalidArgument(
                    "--cities must not contain empty names".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Applies the flags that override environment configuration.
    pub fn apply_overrides(&self, config: Config) -> Config {
        let mut config = config
            .with_api_key(self.api_key.clone())
            .with_output_dir(self.output_dir.clone());
        if let Some(days) = self.days {
            config.prediction_days = days;
        }
        config
    }
}

fn build_source(demo: bool, config: &Config) -> Result<Box<dyn AqiSource>> {
    if demo {
        let source = MockAqiSource::demo(DEMO_SEED);
        println!(
            "{} {}",
            "Using offline demo data for:".yellow(),
            source.known_cities().join(", ")
        );
        return Ok(Box::new(source));
    }
    if config.api_key.as_deref().map_or(true, str::is_empty) {
        return Err(AppError::Config(
            "no WAQI API key configured; set WAQI_API_KEY, pass --api-key, or use --demo"
                .to_string(),
        ));
    }
    Ok(Box::new(WaqiClient::new(config)?))
}

/// Builds the application for the parsed flags and runs the selected mode.
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    cli.validate()?;
    let config = cli.apply_overrides(config);
    let source = build_source(cli.demo, &config)?;

    let mut app = AqiApp::new(source, &config);
    if cli.demo {
        app = app.with_predictor(Predictor::new(config.growth_rate).with_noise(5.0, DEMO_SEED));
    }

    match cli.mode() {
        Mode::Interactive => interactive::run_interactive(&app).await,
        Mode::SingleCity(city) => run_single_city(&app, &city, cli.save_plots).await,
        Mode::MultiCity(cities) => run_multi_city(&app, &cities).await,
    }
}

async fn run_single_city(app: &AqiApp, city: &str, save_plots: bool) -> Result<()> {
    info!("Analyzing {} (save plots: {})", city, save_plots);
    let report = app.generate_all_visualizations(city, save_plots).await?;
    display::print_city_info(&report.data.info, app.predictor().growth_rate());
    display::print_comparison(&report.data);
    display::print_artifacts(&report.artifacts, app.visualizer().output_dir());
    Ok(())
}

async fn run_multi_city(app: &AqiApp, cities: &[String]) -> Result<()> {
    info!("Comparing {} cities over {} days", cities.len(), app.prediction_days());
    let spinner = display::spinner(&format!("Fetching AQI for {} cities...", cities.len()))?;
    let report = app.get_multiple_cities_report(cities).await;
    spinner.finish_and_clear();
    display::print_report(&report);
    Ok(())
}
