//! Domain types: AQI categories, city readings, prediction series and reports.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Lowest and highest value on the nominal AQI scale.
pub const AQI_MIN: i32 = 0;
pub const AQI_MAX: i32 = 500;

/// The six AQI severity categories, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub const ALL: [AqiCategory; 6] = [
        AqiCategory::Good,
        AqiCategory::Moderate,
        AqiCategory::UnhealthySensitive,
        AqiCategory::Unhealthy,
        AqiCategory::VeryUnhealthy,
        AqiCategory::Hazardous,
    ];

    /// Inclusive AQI range covered by this category.
    pub fn bounds(self) -> (i32, i32) {
        match self {
            AqiCategory::Good => (0, 50),
            AqiCategory::Moderate => (51, 100),
            AqiCategory::UnhealthySensitive => (101, 150),
            AqiCategory::Unhealthy => (151, 200),
            AqiCategory::VeryUnhealthy => (201, 300),
            AqiCategory::Hazardous => (301, 500),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Compact label for chart axes.
    pub fn short_label(self) -> &'static str {
        match self {
            AqiCategory::UnhealthySensitive => "Unhealthy(S)",
            other => other.label(),
        }
    }

    /// Display color as a `#rrggbb` string.
    pub fn hex_color(self) -> &'static str {
        match self {
            AqiCategory::Good => "#00e400",
            AqiCategory::Moderate => "#ffff00",
            AqiCategory::UnhealthySensitive => "#ff7e00",
            AqiCategory::Unhealthy => "#ff0000",
            AqiCategory::VeryUnhealthy => "#8f3f97",
            AqiCategory::Hazardous => "#7e0023",
        }
    }

    /// Display color as RGB components.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            AqiCategory::Good => (0x00, 0xe4, 0x00),
            AqiCategory::Moderate => (0xff, 0xff, 0x00),
            AqiCategory::UnhealthySensitive => (0xff, 0x7e, 0x00),
            AqiCategory::Unhealthy => (0xff, 0x00, 0x00),
            AqiCategory::VeryUnhealthy => (0x8f, 0x3f, 0x97),
            AqiCategory::Hazardous => (0x7e, 0x00, 0x23),
        }
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Geographical coordinates of the reporting station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single AQI observation for a city.
///
/// Built through [`CityAqiReading::new`], which clamps the value to the nominal
/// scale and derives the category, so `category` always matches `aqi`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAqiReading {
    /// Display name of the requested city.
    pub city: String,
    /// AQI clamped to `[0, 500]`.
    pub aqi: i32,
    /// Value exactly as the provider reported it.
    pub reported_aqi: i32,
    pub category: AqiCategory,
    pub observed_at: DateTime<Utc>,
    pub coordinates: Option<Coordinates>,
    /// Name of the monitoring station the provider resolved the city to.
    pub station: Option<String>,
    pub dominant_pollutant: Option<String>,
}

impl CityAqiReading {
    pub fn new(city: &str, reported_aqi: i32, observed_at: DateTime<Utc>) -> Self {
        let aqi = reported_aqi.clamp(AQI_MIN, AQI_MAX);
        Self {
            city: title_case(city),
            aqi,
            reported_aqi,
            category: crate::categories::categorize(aqi),
            observed_at,
            coordinates: None,
            station: None,
            dominant_pollutant: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Option<Coordinates>) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_station(mut self, station: Option<String>) -> Self {
        self.station = station;
        self
    }

    pub fn with_dominant_pollutant(mut self, pollutant: Option<String>) -> Self {
        self.dominant_pollutant = pollutant;
        self
    }

    /// Hex color of the reading's category, as shown next to the label.
    pub fn color(&self) -> &'static str {
        crate::categories::category_color(self.aqi)
    }

    /// Whether the provider value had to be clamped onto the nominal scale.
    pub fn was_clamped(&self) -> bool {
        self.aqi != self.reported_aqi
    }
}

/// One projected day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedDay {
    /// Days after the observation, starting at 1.
    pub day_offset: u32,
    pub date: NaiveDate,
    pub aqi: f64,
}

/// Projected AQI values for the days following a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSeries {
    pub city: String,
    pub points: Vec<PredictedDay>,
    pub horizon: u32,
}

impl PredictionSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.aqi).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Descriptive statistics over a prediction series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub trend: Trend,
}

/// A reading together with its projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAqiInfo {
    pub reading: CityAqiReading,
    pub prediction: PredictionSeries,
    pub summary: PredictionSummary,
}

/// Result of one city within a multi-city run.
#[derive(Debug, Clone)]
pub struct CityOutcome {
    /// City name as requested.
    pub requested: String,
    pub result: Result<CityAqiInfo, AppError>,
}

impl CityOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// A city and its AQI, used for report extremes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAqi {
    pub city: String,
    pub aqi: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_cities: usize,
    pub successful_fetches: usize,
    pub failed_fetches: usize,
    /// Mean AQI over successful fetches.
    pub average_aqi: Option<f64>,
    pub highest: Option<CityAqi>,
    pub lowest: Option<CityAqi>,
}

/// Per-city outcomes in input order plus aggregate statistics.
#[derive(Debug, Clone)]
pub struct MultiCityReport {
    pub outcomes: Vec<CityOutcome>,
    pub summary: ReportSummary,
}

impl MultiCityReport {
    pub fn from_outcomes(outcomes: Vec<CityOutcome>) -> Self {
        let successes: Vec<&CityAqiReading> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|info| &info.reading)
            .collect();

        let average_aqi = if successes.is_empty() {
            None
        } else {
            let total: i64 = successes.iter().map(|r| r.aqi as i64).sum();
            Some(total as f64 / successes.len() as f64)
        };

        // First occurrence wins ties, matching input order.
        let mut highest: Option<&CityAqiReading> = None;
        let mut lowest: Option<&CityAqiReading> = None;
        for reading in successes.iter().copied() {
            if highest.map_or(true, |h| reading.aqi > h.aqi) {
                highest = Some(reading);
            }
            if lowest.map_or(true, |l| reading.aqi < l.aqi) {
                lowest = Some(reading);
            }
        }
        let to_city_aqi = |r: &CityAqiReading| CityAqi {
            city: r.city.clone(),
            aqi: r.aqi,
        };

        let summary = ReportSummary {
            total_cities: outcomes.len(),
            successful_fetches: successes.len(),
            failed_fetches: outcomes.len() - successes.len(),
            average_aqi,
            highest: highest.map(to_city_aqi),
            lowest: lowest.map(to_city_aqi),
        };

        Self { outcomes, summary }
    }
}

/// Capitalizes every word of a city name: `"new york"` becomes `"New York"`.
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// File-name friendly form of a city name: `"New York"` becomes `"new_york"`.
pub fn city_slug(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<String>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(city: &str, aqi: i32) -> CityAqiReading {
        CityAqiReading::new(city, aqi, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    fn info(city: &str, aqi: i32) -> CityAqiInfo {
        CityAqiInfo {
            reading: reading(city, aqi),
            prediction: PredictionSeries {
                city: city.to_string(),
                points: Vec::new(),
                horizon: 0,
            },
            summary: PredictionSummary {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                trend: Trend::Stable,
            },
        }
    }

    #[test]
    fn test_reading_derives_category_and_clamps() {
        let r = reading("delhi", 612);
        assert_eq!(r.city, "Delhi");
        assert_eq!(r.aqi, 500);
        assert_eq!(r.reported_aqi, 612);
        assert_eq!(r.category, AqiCategory::Hazardous);
        assert!(r.was_clamped());
        assert_eq!(r.color(), "#7e0023");

        let r = reading("london", 42);
        assert_eq!(r.category, AqiCategory::Good);
        assert!(!r.was_clamped());
    }

    #[test]
    fn test_title_case_and_slug() {
        assert_eq!(title_case("new  york"), "New York");
        assert_eq!(title_case("BEIJING"), "Beijing");
        assert_eq!(city_slug("New York"), "new_york");
        assert_eq!(city_slug("São Paulo!"), "são_paulo");
    }

    #[test]
    fn test_report_summary_counts_and_extremes() {
        let outcomes = vec![
            CityOutcome { requested: "london".into(), result: Ok(info("london", 40)) },
            CityOutcome {
                requested: "atlantis".into(),
                result: Err(AppError::NotFound("atlantis".into())),
            },
            CityOutcome { requested: "delhi".into(), result: Ok(info("delhi", 180)) },
            CityOutcome { requested: "paris".into(), result: Ok(info("paris", 40)) },
        ];
        let report = MultiCityReport::from_outcomes(outcomes);
        let s = &report.summary;
        assert_eq!(s.total_cities, 4);
        assert_eq!(s.successful_fetches, 3);
        assert_eq!(s.failed_fetches, 1);
        assert!((s.average_aqi.unwrap() - 86.666_666).abs() < 1e-3);
        assert_eq!(s.highest.as_ref().unwrap().city, "Delhi");
        assert_eq!(s.lowest.as_ref().unwrap().city, "London");
    }

    #[test]
    fn test_report_summary_without_successes() {
        let report = MultiCityReport::from_outcomes(vec![CityOutcome {
            requested: "atlantis".into(),
            result: Err(AppError::NotFound("atlantis".into())),
        }]);
        assert_eq!(report.summary.average_aqi, None);
        assert_eq!(report.summary.highest, None);
        assert_eq!(report.summary.failed_fetches, 1);
    }
}
