//! Terminal rendering of readings, forecasts and reports.

use crate::app::VisualizationData;
use crate::categories::{categorize_f64, category_label, format_aqi_display};
use crate::error::{AppError, Result};
use crate::models::{AqiCategory, CityAqiInfo, MultiCityReport};
use crate::visualizer::ChartKind;
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn paint(text: &str, category: AqiCategory) -> ColoredString {
    let (r, g, b) = category.rgb();
    text.truecolor(r, g, b).bold()
}

fn category_cell(category: AqiCategory) -> Cell {
    let (r, g, b) = category.rgb();
    Cell::new(category.label()).fg(Color::Rgb { r, g, b })
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Day-by-day forecast for one city.
pub fn forecast_table(info: &CityAqiInfo) -> Table {
    let mut table = new_table(vec!["Day", "Date", "Predicted AQI", "Category"]);
    for point in &info.prediction.points {
        table.add_row(vec![
            Cell::new(format!("+{}", point.day_offset)),
            Cell::new(point.date.format("%Y-%m-%d")),
            Cell::new(format!("{:.1}", point.aqi)),
            category_cell(categorize_f64(point.aqi)),
        ]);
    }
    table
}

pub fn print_city_info(info: &CityAqiInfo, growth_rate: f64) {
    let reading = &info.reading;
    println!("\n{}", format!("=== {} ===", reading.city).cyan().bold());
    println!(
        "{}",
        paint(&format_aqi_display(reading.aqi, &reading.city), reading.category)
    );
    println!(
        "Category: {} ({})",
        category_label(reading.aqi),
        reading.color()
    );
    if reading.was_clamped() {
        println!(
            "{}",
            format!(
                "Provider reported {}, outside the 0-500 scale",
                reading.reported_aqi
            )
            .yellow()
        );
    }
    if let Some(station) = &reading.station {
        println!("Station: {}", station);
    }
    if let Some(pollutant) = &reading.dominant_pollutant {
        println!("Dominant pollutant: {}", pollutant);
    }
    println!(
        "Observed: {}",
        reading.observed_at.format("%Y-%m-%d %H:%M UTC")
    );

    println!(
        "\n{}",
        format!(
            "{}-day forecast ({:.1}% growth per day)",
            info.prediction.horizon,
            growth_rate * 100.0
        )
        .bold()
    );
    println!("{}", forecast_table(info));
    let summary = &info.summary;
    println!(
        "Min {:.1} / Max {:.1} / Mean {:.1}, trend {}",
        summary.min, summary.max, summary.mean, summary.trend
    );
}

/// Comparison cities side by side with the last forecast day.
pub fn comparison_table(data: &VisualizationData) -> Table {
    let last_day = format!("Day {}", data.days);
    let mut table = new_table(vec!["City", "Current AQI", "Category", last_day.as_str()]);
    for row in &data.heatmap_rows {
        match row.current {
            Some(aqi) => {
                let forecast = row
                    .predictions
                    .as_ref()
                    .and_then(|p| p.last())
                    .map(|v| format!("{:.1}", v))
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(vec![
                    Cell::new(&row.city),
                    Cell::new(aqi),
                    category_cell(crate::categories::categorize(aqi)),
                    Cell::new(forecast),
                ]);
            },
            None => {
                table.add_row(vec![
                    Cell::new(&row.city),
                    Cell::new("n/a"),
                    Cell::new("unavailable").fg(Color::DarkGrey),
                    Cell::new("-"),
                ]);
            },
        }
    }
    table
}

pub fn print_comparison(data: &VisualizationData) {
    println!("\n{}", "Comparison".bold());
    println!("{}", comparison_table(data));
}

/// One row per requested city, failures included.
pub fn report_table(report: &MultiCityReport) -> Table {
    let mut table = new_table(vec!["City", "AQI", "Category", "Forecast", "Trend", "Status"]);
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(info) => {
                let forecast = info
                    .prediction
                    .points
                    .last()
                    .map(|p| format!("{:.1} on day {}", p.aqi, p.day_offset))
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(vec![
                    Cell::new(&info.reading.city),
                    Cell::new(info.reading.aqi),
                    category_cell(info.reading.category),
                    Cell::new(forecast),
                    Cell::new(info.summary.trend),
                    Cell::new("ok").fg(Color::Green),
                ]);
            },
            Err(e) => {
                table.add_row(vec![
                    Cell::new(&outcome.requested),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(e).fg(Color::Red),
                ]);
            },
        }
    }
    table
}

pub fn print_report(report: &MultiCityReport) {
    println!("\n{}", "Multi-city AQI report".cyan().bold());
    println!("{}", report_table(report));

    let summary = &report.summary;
    println!(
        "Cities: {}, successful: {}, failed: {}",
        summary.total_cities,
        summary.successful_fetches.to_string().green(),
        summary.failed_fetches.to_string().red()
    );
    if let Some(average) = summary.average_aqi {
        println!(
            "Average AQI: {}",
            paint(&format!("{:.1}", average), categorize_f64(average))
        );
    }
    if let (Some(highest), Some(lowest)) = (&summary.highest, &summary.lowest) {
        println!(
            "Highest: {} ({}), lowest: {} ({})",
            highest.city, highest.aqi, lowest.city, lowest.aqi
        );
    }
}

/// What happened to the charts: the saved files, or a hint that nothing was written.
pub fn artifacts_summary(artifacts: &[(ChartKind, PathBuf)], output_dir: &Path) -> String {
    if artifacts.is_empty() {
        return "Charts were rendered in memory only and are not displayed; \
                pass --save-plots to write them as PNG files."
            .to_string();
    }
    let mut summary = format!("Saved {} charts to {}", artifacts.len(), output_dir.display());
    for (kind, path) in artifacts {
        summary.push_str(&format!("\n  {:<10} {}", kind.name(), path.display()));
    }
    summary
}

pub fn print_artifacts(artifacts: &[(ChartKind, PathBuf)], output_dir: &Path) {
    let summary = artifacts_summary(artifacts, output_dir);
    if artifacts.is_empty() {
        println!("{}", summary.yellow());
    } else {
        println!("{}", summary.green());
    }
}

pub fn print_error(err: &AppError) {
    println!("{} {}", "Error:".red().bold(), err.to_string().red());
}

/// Steady-ticking spinner shown while requests are in flight.
pub fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityAqiReading, CityOutcome, PredictionSeries, PredictionSummary, Trend};
    use crate::predictor::Predictor;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn info(city: &str, aqi: i32) -> CityAqiInfo {
        let reading =
            CityAqiReading::new(city, aqi, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let prediction = Predictor::default()
            .predict_from(city, aqi, 3, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .unwrap();
        let summary = Predictor::summarize(&prediction).unwrap();
        CityAqiInfo {
            reading,
            prediction,
            summary,
        }
    }

    #[test]
    fn test_forecast_table_lists_every_day() {
        let rendered = forecast_table(&info("London", 40)).to_string();
        assert!(rendered.contains("2024-03-02"));
        assert!(rendered.contains("2024-03-04"));
        assert!(rendered.contains("+3"));
        assert!(!rendered.contains("2024-03-05"));
    }

    #[test]
    fn test_unsaved_charts_point_to_save_flag() {
        let summary = artifacts_summary(&[], Path::new("plots"));
        assert!(summary.contains("not displayed"));
        assert!(summary.contains("--save-plots"));

        let saved = vec![(ChartKind::Meter, PathBuf::from("plots/london_aqi_meter.png"))];
        let summary = artifacts_summary(&saved, Path::new("plots"));
        assert!(summary.starts_with("Saved 1 charts to plots"));
        assert!(summary.contains("london_aqi_meter.png"));
    }

    #[test]
    fn test_report_table_shows_failures() {
        let report = MultiCityReport::from_outcomes(vec![
            CityOutcome {
                requested: "london".to_string(),
                result: Ok(info("london", 40)),
            },
            CityOutcome {
                requested: "Atlantis".to_string(),
                result: Err(AppError::NotFound("city 'Atlantis' is unknown".to_string())),
            },
        ]);
        let rendered = report_table(&report).to_string();
        assert!(rendered.contains("London"));
        assert!(rendered.contains("Atlantis"));
        assert!(rendered.contains("unknown"));
    }

    #[test]
    fn test_report_table_empty_prediction() {
        let mut city = info("Paris", 30);
        city.prediction = PredictionSeries {
            city: "Paris".to_string(),
            points: Vec::new(),
            horizon: 0,
        };
        city.summary = PredictionSummary {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            trend: Trend::Stable,
        };
        let report = MultiCityReport::from_outcomes(vec![CityOutcome {
            requested: "Paris".to_string(),
            result: Ok(city),
        }]);
        assert!(report_table(&report).to_string().contains("Paris"));
    }
}
