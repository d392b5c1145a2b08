//! AQI category lookup, validation and display helpers.
//!
//! Values outside the nominal `[0, 500]` scale are clamped before lookup, so every
//! integer maps to exactly one category: anything above 500 is `Hazardous`,
//! anything below 0 is `Good`.

use crate::models::{title_case, AqiCategory, AQI_MAX, AQI_MIN};

/// Maps an AQI value to its category.
pub fn categorize(aqi: i32) -> AqiCategory {
    let clamped = aqi.clamp(AQI_MIN, AQI_MAX);
    AqiCategory::ALL
        .into_iter()
        .find(|category| {
            let (low, high) = category.bounds();
            (low..=high).contains(&clamped)
        })
        .unwrap_or(AqiCategory::Hazardous)
}

/// Category of a fractional value, as produced by the predictor.
pub fn categorize_f64(aqi: f64) -> AqiCategory {
    if aqi.is_nan() {
        return AqiCategory::Good;
    }
    categorize(aqi.round().clamp(AQI_MIN as f64, AQI_MAX as f64) as i32)
}

pub fn category_label(aqi: i32) -> &'static str {
    categorize(aqi).label()
}

pub fn category_color(aqi: i32) -> &'static str {
    categorize(aqi).hex_color()
}

/// Whether a value lies on the nominal AQI scale.
pub fn validate_aqi(aqi: f64) -> bool {
    aqi.is_finite() && (AQI_MIN as f64..=AQI_MAX as f64).contains(&aqi)
}

/// One-line description of a city's current AQI.
pub fn format_aqi_display(aqi: i32, city: &str) -> String {
    let city = title_case(city);
    if !validate_aqi(aqi as f64) {
        return format!("Invalid AQI value for {}: {}", city, aqi);
    }
    format!("Current AQI in {}: {} ({})", city, aqi, category_label(aqi))
}
