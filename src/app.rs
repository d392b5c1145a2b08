//! Orchestration: fetch, predict, render and report.

use crate::api::AqiSource;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    title_case, CityAqiInfo, CityAqiReading, CityOutcome, MultiCityReport, PredictionSeries,
};
use crate::predictor::Predictor;
use crate::visualizer::{ChartKind, HeatmapRow, Visualizer};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Everything the charts need for one city, fetched once.
#[derive(Debug, Clone)]
pub struct VisualizationData {
    pub info: CityAqiInfo,
    /// Comparison cities in display order, the primary city first.
    pub comparison: Vec<(String, Result<CityAqiReading>)>,
    pub heatmap_rows: Vec<HeatmapRow>,
    pub days: usize,
}

impl VisualizationData {
    pub fn comparison_readings(&self) -> Vec<CityAqiReading> {
        self.comparison
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok().cloned())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct VisualizationReport {
    pub data: VisualizationData,
    /// Saved chart files; empty when nothing was saved.
    pub artifacts: Vec<(ChartKind, PathBuf)>,
}

pub struct AqiApp {
    source: Box<dyn AqiSource>,
    predictor: Predictor,
    visualizer: Visualizer,
    prediction_days: i64,
    comparison_cities: Vec<String>,
    max_concurrent_fetches: usize,
}

impl AqiApp {
    pub fn new(source: Box<dyn AqiSource>, config: &Config) -> Self {
        Self {
            source,
            predictor: Predictor::new(config.growth_rate),
            visualizer: Visualizer::new(config.output_dir.clone()),
            prediction_days: config.prediction_days,
            comparison_cities: config.comparison_cities.clone(),
            max_concurrent_fetches: config.max_concurrent_fetches,
        }
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    /// Overrides the horizon; non-positive values surface as errors on first use.
    #[cfg(test)]
    pub fn with_prediction_days(mut self, days: i64) -> Self {
        self.prediction_days = days;
        self
    }

    pub fn prediction_days(&self) -> i64 {
        self.prediction_days
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    /// Current reading for `city` with its projection and summary.
    pub async fn get_city_aqi_info(&self, city: &str) -> Result<CityAqiInfo> {
        let reading = self.source.fetch(city).await?;
        let prediction =
            self.predictor
                .predict(&reading.city, reading.aqi, self.prediction_days)?;
        build_info(reading, prediction)
    }

    /// Fetches the city and every comparison city, then projects all of them.
    ///
    /// Comparison failures are logged and kept; only a failure of the primary city
    /// is an error.
    pub async fn collect_visualization_data(&self, city: &str) -> Result<VisualizationData> {
        let info = self.get_city_aqi_info(city).await?;
        let days = usize::try_from(self.prediction_days).map_err(|_| {
            AppError::InvalidArgument(format!(
                "prediction horizon must be positive, got {}",
                self.prediction_days
            ))
        })?;

        let mut seen = HashSet::from([info.reading.city.to_lowercase()]);
        let others: Vec<String> = self
            .comparison_cities
            .iter()
            .map(|c| title_case(c))
            .filter(|c| !c.is_empty() && seen.insert(c.to_lowercase()))
            .collect();
        debug!("Comparing {} against {:?}", info.reading.city, others);

        let fetched = self
            .source
            .fetch_many(&others, self.max_concurrent_fetches)
            .await;
        let mut comparison = vec![(info.reading.city.clone(), Ok(info.reading.clone()))];
        comparison.extend(fetched.into_iter().map(|(name, result)| {
            if let Err(e) = &result {
                warn!("Skipping comparison city {}: {}", name, e);
            }
            (name, result)
        }));

        let projected = self.project(comparison.clone());
        let heatmap_rows = projected
            .into_iter()
            .map(|(name, result)| match result {
                Ok(info) => HeatmapRow {
                    city: info.reading.city,
                    current: Some(info.reading.aqi),
                    predictions: Some(info.prediction.values()),
                },
                Err(_) => HeatmapRow::missing(&name),
            })
            .collect();

        Ok(VisualizationData {
            info,
            comparison,
            heatmap_rows,
            days,
        })
    }

    /// Draws every chart from already collected data.
    pub fn render_visualizations(
        &self,
        data: &VisualizationData,
        save_plots: bool,
    ) -> Result<Vec<(ChartKind, PathBuf)>> {
        let city = &data.info.reading.city;
        let reading = &data.info.reading;
        let series = &data.info.prediction;
        let comparison = data.comparison_readings();
        let viz = &self.visualizer;

        let mut artifacts = Vec::new();
        for kind in ChartKind::ALL {
            let target = save_plots.then(|| viz.artifact_path(city, kind));
            let path = target.as_deref();
            let saved = match kind {
                ChartKind::Meter => viz.plot_aqi_meter(reading, path)?,
                ChartKind::Histogram => viz.plot_histogram(reading, series, path)?,
                ChartKind::Trend => viz.plot_trend_line(reading, series, path)?,
                ChartKind::Heatmap => viz.plot_heatmap(&data.heatmap_rows, data.days, path)?,
                ChartKind::Comparison => viz.plot_comparison(&comparison, path)?,
            };
            if let Some(saved) = saved {
                artifacts.push((kind, saved));
            }
        }
        info!("Rendered all charts for {} ({} saved)", city, artifacts.len());
        Ok(artifacts)
    }

    pub async fn generate_all_visualizations(
        &self,
        city: &str,
        save_plots: bool,
    ) -> Result<VisualizationReport> {
        let data = self.collect_visualization_data(city).await?;
        let artifacts = self.render_visualizations(&data, save_plots)?;
        Ok(VisualizationReport { data, artifacts })
    }

    /// Fetches and projects every city. Failures are recorded per city and the
    /// outcomes keep the order of `cities`.
    pub async fn get_multiple_cities_report(&self, cities: &[String]) -> MultiCityReport {
        info!("Building report for {} cities", cities.len());
        let fetched = self
            .source
            .fetch_many(cities, self.max_concurrent_fetches)
            .await;
        let outcomes = self
            .project(fetched)
            .into_iter()
            .map(|(requested, result)| {
                if let Err(e) = &result {
                    warn!("Failed to get AQI for {}: {}", requested, e);
                }
                CityOutcome { requested, result }
            })
            .collect();
        MultiCityReport::from_outcomes(outcomes)
    }

    /// Attaches a projection to every successful reading, preserving order.
    fn project(
        &self,
        fetched: Vec<(String, Result<CityAqiReading>)>,
    ) -> Vec<(String, Result<CityAqiInfo>)> {
        let readings: Vec<CityAqiReading> = fetched
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok().cloned())
            .collect();
        let mut predictions = self
            .predictor
            .predict_many(&readings, self.prediction_days)
            .into_iter();

        fetched
            .into_iter()
            .map(|(name, result)| {
                let info = result.and_then(|reading| {
                    let prediction = predictions.next().ok_or_else(|| {
                        AppError::InvalidArgument(format!("no prediction computed for {}", name))
                    })??;
                    build_info(reading, prediction)
                });
                (name, info)
            })
            .collect()
    }
}

fn build_info(reading: CityAqiReading, prediction: PredictionSeries) -> Result<CityAqiInfo> {
    let summary = Predictor::summarize(&prediction)?;
    Ok(CityAqiInfo {
        reading,
        prediction,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockAqiSource;
    use std::fs;
    use tempfile::tempdir;

    fn app_with(source: MockAqiSource, output_dir: PathBuf) -> AqiApp {
        let config = Config {
            output_dir,
            comparison_cities: vec![
                "Delhi".to_string(),
                "Beijing".to_string(),
                "london".to_string(),
                "Atlantis".to_string(),
            ],
            ..Config::default()
        };
        AqiApp::new(Box::new(source), &config)
    }

    fn source() -> MockAqiSource {
        MockAqiSource::new()
            .with_reading("London", 42)
            .with_reading("Delhi", 180)
            .with_reading("Beijing", 130)
            .observed_at(2024, 3, 1)
    }

    #[tokio::test]
    async fn test_city_info_has_default_horizon() {
        let app = app_with(source(), PathBuf::from("."));
        let info = app.get_city_aqi_info("london").await.unwrap();
        assert_eq!(info.reading.city, "London");
        assert_eq!(info.prediction.len(), 7);
        assert!(info.prediction.values().iter().all(|v| (0.0..=500.0).contains(v)));
        assert!(info.summary.min <= info.summary.mean && info.summary.mean <= info.summary.max);
    }

    #[tokio::test]
    async fn test_city_info_propagates_not_found() {
        let app = app_with(source(), PathBuf::from("."));
        let result = app.get_city_aqi_info("Atlantis").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_horizon_is_rejected() {
        let app = app_with(source(), PathBuf::from(".")).with_prediction_days(0);
        let result = app.get_city_aqi_info("London").await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_report_records_failures_in_input_order() {
        let app = app_with(source(), PathBuf::from("."));
        let cities: Vec<String> = ["Delhi", "Atlantis", "Beijing", "London"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let report = app.get_multiple_cities_report(&cities).await;

        let requested: Vec<&str> = report.outcomes.iter().map(|o| o.requested.as_str()).collect();
        assert_eq!(requested, vec!["Delhi", "Atlantis", "Beijing", "London"]);
        assert_eq!(report.summary.successful_fetches, 3);
        assert_eq!(report.summary.failed_fetches, 1);
        assert!(!report.outcomes[1].is_success());
        assert_eq!(report.summary.highest.as_ref().unwrap().city, "Delhi");
        for outcome in report.outcomes.iter().filter(|o| o.is_success()) {
            let info = outcome.result.as_ref().unwrap();
            assert_eq!(info.prediction.city, info.reading.city);
            assert_eq!(info.prediction.len(), 7);
        }
    }

    #[tokio::test]
    async fn test_comparison_deduplicates_and_keeps_missing_rows() {
        let app = app_with(source(), PathBuf::from("."));
        let data = app.collect_visualization_data("London").await.unwrap();

        let names: Vec<&str> = data.comparison.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["London", "Delhi", "Beijing", "Atlantis"]);
        assert_eq!(data.comparison_readings().len(), 3);
        assert_eq!(data.heatmap_rows.len(), 4);
        assert_eq!(data.heatmap_rows[3], HeatmapRow::missing("Atlantis"));
        assert_eq!(data.heatmap_rows[0].predictions.as_ref().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_saving_writes_all_charts() {
        let dir = tempdir().unwrap();
        let app = app_with(source(), dir.path().to_path_buf());
        let report = app.generate_all_visualizations("London", true).await.unwrap();

        assert_eq!(report.artifacts.len(), ChartKind::ALL.len());
        for kind in ChartKind::ALL {
            let expected = app.visualizer().artifact_path("London", kind);
            assert!(report.artifacts.contains(&(kind, expected.clone())));
            assert!(expected.exists(), "{} missing", expected.display());
        }
    }

    #[tokio::test]
    async fn test_display_mode_saves_nothing() {
        let dir = tempdir().unwrap();
        let app = app_with(source(), dir.path().to_path_buf());
        let report = app.generate_all_visualizations("Delhi", false).await.unwrap();

        assert!(report.artifacts.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rendering_reuses_collected_data() {
        let dir = tempdir().unwrap();
        let app = app_with(source(), dir.path().to_path_buf());
        let data = app.collect_visualization_data("Beijing").await.unwrap();

        assert!(app.render_visualizations(&data, false).unwrap().is_empty());
        let saved = app.render_visualizations(&data, true).unwrap();
        assert_eq!(saved.len(), 5);
    }
}
