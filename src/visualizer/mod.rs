//! Chart rendering for readings and predictions.
//!
//! Every chart can either be written to a PNG file or rendered into an in-memory
//! bitmap (no file is touched). File names are derived from the city and chart kind,
//! e.g. `london_aqi_meter.png`.

mod charts;

use crate::error::{AppError, Result};
use crate::models::{city_slug, CityAqiReading, PredictionSeries};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// DejaVu Sans, see `assets/fonts/LICENSE`.
static CHART_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_LOADED: OnceLock<bool> = OnceLock::new();

/// Registers the bundled font under the family name every chart uses.
/// Runs once per process; later calls only report the first outcome.
fn load_chart_font() -> Result<()> {
    let loaded = *FONT_LOADED.get_or_init(|| {
        let loaded = register_font(charts::FONT, FontStyle::Normal, CHART_FONT).is_ok();
        debug!("Registered chart font {} ({})", charts::FONT, loaded);
        loaded
    });
    if loaded {
        Ok(())
    } else {
        Err(AppError::Render(
            "bundled chart font could not be parsed".to_string(),
        ))
    }
}

/// The five chart types produced per city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Meter,
    Histogram,
    Trend,
    Heatmap,
    Comparison,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Meter,
        ChartKind::Histogram,
        ChartKind::Trend,
        ChartKind::Heatmap,
        ChartKind::Comparison,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::Meter => "meter",
            ChartKind::Histogram => "histogram",
            ChartKind::Trend => "trend",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Comparison => "comparison",
        }
    }

    /// Canvas size in pixels.
    fn size(self) -> (u32, u32) {
        match self {
            ChartKind::Meter => (600, 400),
            ChartKind::Histogram => (800, 500),
            ChartKind::Trend => (1000, 600),
            ChartKind::Heatmap | ChartKind::Comparison => (1200, 600),
        }
    }
}

/// One row of the prediction heatmap. Rows without data are drawn as blank cells.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapRow {
    pub city: String,
    pub current: Option<i32>,
    pub predictions: Option<Vec<f64>>,
}

impl HeatmapRow {
    pub fn missing(city: &str) -> Self {
        Self {
            city: city.to_string(),
            current: None,
            predictions: None,
        }
    }

    /// Today's value followed by the predictions, if both are known.
    fn values(&self) -> Option<Vec<f64>> {
        match (self.current, &self.predictions) {
            (Some(current), Some(predictions)) => {
                let mut values = Vec::with_capacity(predictions.len() + 1);
                values.push(current as f64);
                values.extend_from_slice(predictions);
                Some(values)
            },
            _ => None,
        }
    }
}

pub struct Visualizer {
    output_dir: PathBuf,
}

impl Visualizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Deterministic file location for a chart: `<output_dir>/<city>_aqi_<kind>.png`.
    pub fn artifact_path(&self, city: &str, kind: ChartKind) -> PathBuf {
        self.output_dir
            .join(format!("{}_aqi_{}.png", city_slug(city), kind.name()))
    }

    /// Semicircular gauge with one wedge per category and a needle at the current value.
    pub fn plot_aqi_meter(
        &self,
        reading: &CityAqiReading,
        save_path: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        self.render(ChartKind::Meter, save_path, |root| {
            charts::draw_meter(root, reading)
        })
    }

    /// Current value followed by the predictions, points colored by category.
    pub fn plot_trend_line(
        &self,
        reading: &CityAqiReading,
        series: &PredictionSeries,
        save_path: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        ensure_series(series)?;
        self.render(ChartKind::Trend, save_path, |root| {
            charts::draw_trend(root, reading, series)
        })
    }

    /// Number of days (today plus predictions) falling into each category.
    pub fn plot_histogram(
        &self,
        reading: &CityAqiReading,
        series: &PredictionSeries,
        save_path: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        ensure_series(series)?;
        self.render(ChartKind::Histogram, save_path, |root| {
            charts::draw_histogram(root, reading, series)
        })
    }

    /// Cities by day grid of current and predicted values.
    pub fn plot_heatmap(
        &self,
        rows: &[HeatmapRow],
        days: usize,
        save_path: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        if rows.is_empty() {
            return Err(AppError::Render("heatmap needs at least one city".to_string()));
        }
        if days == 0 {
            return Err(AppError::Render("heatmap needs at least one day".to_string()));
        }
        let grid: Vec<(String, Option<Vec<f64>>)> = rows
            .iter()
            .map(|row| {
                let values = row.values();
                match &values {
                    Some(v) if v.len() != days + 1 => Err(AppError::Render(format!(
                        "heatmap row for {} has {} predictions, expected {}",
                        row.city,
                        v.len() - 1,
                        days
                    ))),
                    _ => Ok((row.city.clone(), values)),
                }
            })
            .collect::<Result<_>>()?;
        if grid.iter().all(|(_, values)| values.is_none()) {
            return Err(AppError::Render(
                "no valid data available for the heatmap".to_string(),
            ));
        }

        self.render(ChartKind::Heatmap, save_path, |root| {
            charts::draw_heatmap(root, &grid, days)
        })
    }

    /// Bar per city colored by category.
    pub fn plot_comparison(
        &self,
        readings: &[CityAqiReading],
        save_path: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        if readings.is_empty() {
            return Err(AppError::Render(
                "comparison chart needs at least one city".to_string(),
            ));
        }
        self.render(ChartKind::Comparison, save_path, |root| {
            charts::draw_comparison(root, readings)
        })
    }

    /// Draws onto a PNG file when `save_path` is given, otherwise onto a scratch buffer.
    fn render<F>(&self, kind: ChartKind, save_path: Option<&Path>, draw: F) -> Result<Option<PathBuf>>
    where
        F: for<'a> Fn(&DrawingArea<BitMapBackend<'a>, Shift>) -> Result<()>,
    {
        load_chart_font()?;
        let size = kind.size();
        match save_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let root = BitMapBackend::new(path, size).into_drawing_area();
                draw(&root)?;
                root.present()?;
                info!("Saved {} chart to {}", kind.name(), path.display());
                Ok(Some(path.to_path_buf()))
            },
            None => {
                let mut buffer = vec![0u8; size.0 as usize * size.1 as usize * 3];
                let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
                draw(&root)?;
                root.present()?;
                info!(
                    "Rendered {} chart in memory only; nothing is displayed or saved without a save path",
                    kind.name()
                );
                Ok(None)
            },
        }
    }
}

fn ensure_series(series: &PredictionSeries) -> Result<()> {
    if series.is_empty() {
        return Err(AppError::Render(format!(
            "prediction series for {} is empty",
            series.city
        )));
    }
    if series.values().iter().any(|v| !v.is_finite()) {
        return Err(AppError::Render(format!(
            "prediction series for {} contains non-finite values",
            series.city
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::Predictor;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn reading(city: &str, aqi: i32) -> CityAqiReading {
        CityAqiReading::new(city, aqi, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    fn series(city: &str, aqi: i32, days: i64) -> PredictionSeries {
        Predictor::default().predict(city, aqi, days).unwrap()
    }

    #[test]
    fn test_chart_text_is_rasterised() {
        load_chart_font().unwrap();
        let (w, h) = (200u32, 60u32);
        let mut buffer = vec![0u8; (w * h * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
            root.fill(&WHITE).unwrap();
            root.draw(&Text::new(
                "AQI 42",
                (10, 10),
                (charts::FONT, 30.0).into_font().color(&BLACK),
            ))
            .unwrap();
            root.present().unwrap();
        }
        assert!(
            buffer.iter().any(|&channel| channel < 128),
            "no glyph pixels were drawn"
        );
    }

    #[test]
    fn test_artifact_path_is_deterministic() {
        let viz = Visualizer::new("/tmp/charts");
        assert_eq!(
            viz.artifact_path("New York", ChartKind::Meter),
            PathBuf::from("/tmp/charts/new_york_aqi_meter.png")
        );
        assert_eq!(
            viz.artifact_path("london", ChartKind::Comparison),
            PathBuf::from("/tmp/charts/london_aqi_comparison.png")
        );
    }

    #[test]
    fn test_saving_writes_every_chart() {
        let dir = tempdir().unwrap();
        let viz = Visualizer::new(dir.path().join("nested"));
        let london = reading("London", 42);
        let delhi = reading("Delhi", 260);
        let prediction = series("London", 42, 7);

        let rows = vec![
            HeatmapRow {
                city: "London".to_string(),
                current: Some(42),
                predictions: Some(prediction.values()),
            },
            HeatmapRow::missing("Atlantis"),
        ];

        let path = |kind| viz.artifact_path("London", kind);
        let outputs = vec![
            (
                ChartKind::Meter,
                viz.plot_aqi_meter(&london, Some(path(ChartKind::Meter).as_path())),
            ),
            (
                ChartKind::Trend,
                viz.plot_trend_line(&london, &prediction, Some(path(ChartKind::Trend).as_path())),
            ),
            (
                ChartKind::Histogram,
                viz.plot_histogram(
                    &london,
                    &prediction,
                    Some(path(ChartKind::Histogram).as_path()),
                ),
            ),
            (
                ChartKind::Heatmap,
                viz.plot_heatmap(&rows, 7, Some(path(ChartKind::Heatmap).as_path())),
            ),
            (
                ChartKind::Comparison,
                viz.plot_comparison(
                    &[london.clone(), delhi],
                    Some(path(ChartKind::Comparison).as_path()),
                ),
            ),
        ];

        for (kind, output) in outputs {
            let saved = output.unwrap().expect("saving should return the path");
            assert_eq!(saved, path(kind));
            let metadata = fs::metadata(&saved).unwrap();
            assert!(metadata.len() > 0, "{} is empty", saved.display());
        }
    }

    #[test]
    fn test_display_mode_writes_no_file() {
        let dir = tempdir().unwrap();
        let viz = Visualizer::new(dir.path());
        let london = reading("London", 42);
        let prediction = series("London", 42, 7);

        assert_eq!(viz.plot_aqi_meter(&london, None).unwrap(), None);
        assert_eq!(viz.plot_trend_line(&london, &prediction, None).unwrap(), None);
        assert_eq!(viz.plot_histogram(&london, &prediction, None).unwrap(), None);
        assert_eq!(viz.plot_comparison(&[london], None).unwrap(), None);

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_inputs_are_render_errors() {
        let viz = Visualizer::new(".");
        let london = reading("London", 42);
        let empty = PredictionSeries {
            city: "London".to_string(),
            points: Vec::new(),
            horizon: 0,
        };

        assert!(matches!(viz.plot_comparison(&[], None), Err(AppError::Render(_))));
        assert!(matches!(
            viz.plot_trend_line(&london, &empty, None),
            Err(AppError::Render(_))
        ));
        assert!(matches!(
            viz.plot_histogram(&london, &empty, None),
            Err(AppError::Render(_))
        ));
        assert!(matches!(viz.plot_heatmap(&[], 7, None), Err(AppError::Render(_))));
        assert!(matches!(
            viz.plot_heatmap(&[HeatmapRow::missing("Atlantis")], 7, None),
            Err(AppError::Render(_))
        ));
    }

    #[test]
    fn test_heatmap_rejects_mismatched_rows() {
        let viz = Visualizer::new(".");
        let rows = vec![HeatmapRow {
            city: "London".to_string(),
            current: Some(42),
            predictions: Some(vec![43.0, 44.0]),
        }];
        assert!(matches!(viz.plot_heatmap(&rows, 7, None), Err(AppError::Render(_))));
    }

    #[test]
    fn test_extreme_values_render() {
        let viz = Visualizer::new(".");
        for aqi in [0, 500] {
            let r = reading("Edge", aqi);
            let s = series("Edge", aqi, 3);
            assert!(viz.plot_aqi_meter(&r, None).is_ok());
            assert!(viz.plot_trend_line(&r, &s, None).is_ok());
            assert!(viz.plot_histogram(&r, &s, None).is_ok());
            assert!(viz.plot_comparison(&[r.clone()], None).is_ok());
        }
    }
}
