//! Provides a mock AQI source for generating plausible city readings offline.
//!
//! Backs the `--demo` flag and tests that need consistent, controllable readings
//! without hitting the real WAQI API.

use super::AqiSource;
use crate::error::{AppError, Result};
use crate::models::{CityAqiReading, Coordinates};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::debug;

/// Baseline AQI and station coordinates for the built-in demo cities.
const DEMO_CITIES: [(&str, i32, (f64, f64)); 10] = [
    ("Delhi", 185, (28.6139, 77.2090)),
    ("Beijing", 125, (39.9042, 116.4074)),
    ("New York", 48, (40.7128, -74.0060)),
    ("London", 38, (51.5074, -0.1278)),
    ("Mumbai", 152, (19.0760, 72.8777)),
    ("Shanghai", 95, (31.2304, 121.4737)),
    ("Paris", 44, (48.8566, 2.3522)),
    ("Lahore", 210, (31.5204, 74.3587)),
    ("Los Angeles", 72, (34.0522, -118.2437)),
    ("Sydney", 22, (-33.8688, 151.2093)),
];

#[derive(Debug, Clone)]
enum Entry {
    Reading(i32, Option<Coordinates>),
    #[cfg(test)]
    Failure(AppError),
}

impl Entry {
    fn is_reading(&self) -> bool {
        match self {
            Entry::Reading(..) => true,
            #[cfg(test)]
            Entry::Failure(_) => false,
        }
    }
}

/// Serves readings from an in-memory table.
///
/// Lookups are case-insensitive. Cities that are not in the table fail with
/// `AppError::NotFound`, like an unknown station on the real provider.
pub struct MockAqiSource {
    entries: HashMap<String, Entry>,
    observed_at: DateTime<Utc>,
}

impl MockAqiSource {
    /// Creates an empty source; every lookup fails until readings are added.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            observed_at: Utc::now(),
        }
    }

    /// Creates a source pre-filled with the demo cities.
    ///
    /// Each baseline is jittered by up to ±15% using an RNG seeded with `seed`, so
    /// the same seed always yields the same readings.
    pub fn demo(seed: u64) -> Self {
        debug!("Creating demo AQI source with seed {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut source = Self::new();
        for (city, base, (lat, lon)) in DEMO_CITIES {
            let jitter = rng.gen_range(-0.15..=0.15);
            let aqi = ((base as f64) * (1.0 + jitter)).round() as i32;
            source.entries.insert(
                key(city),
                Entry::Reading(
                    aqi.max(0),
                    Some(Coordinates {
                        latitude: lat,
                        longitude: lon,
                    }),
                ),
            );
        }
        source
    }

    /// Names of the cities this source can answer for.
    pub fn known_cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_reading())
            .map(|(k, _)| crate::models::title_case(k))
            .collect();
        cities.sort();
        cities
    }
}

impl Default for MockAqiSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Builders for tests that need a fixed table of readings and failures.
#[cfg(test)]
impl MockAqiSource {
    /// Adds or replaces a city reading.
    pub fn with_reading(mut self, city: &str, aqi: i32) -> Self {
        self.entries.insert(key(city), Entry::Reading(aqi, None));
        self
    }

    /// Makes every fetch of `city` fail with `error`.
    pub fn with_failure(mut self, city: &str, error: AppError) -> Self {
        self.entries.insert(key(city), Entry::Failure(error));
        self
    }

    /// Fixes the observation time reported for every reading.
    pub fn observed_at(mut self, year: i32, month: u32, day: u32) -> Self {
        use chrono::TimeZone;
        if let Some(at) = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).single() {
            self.observed_at = at;
        }
        self
    }
}

#[async_trait]
impl AqiSource for MockAqiSource {
    async fn fetch(&self, city: &str) -> Result<CityAqiReading> {
        let city = city.trim();
        if city.is_empty() {
            return Err(AppError::InvalidArgument("city name must not be empty".to_string()));
        }
        match self.entries.get(&key(city)) {
            Some(Entry::Reading(aqi, coordinates)) => {
                debug!("Serving mock AQI {} for {}", aqi, city);
                Ok(CityAqiReading::new(city, *aqi, self.observed_at)
                    .with_coordinates(*coordinates)
                    .with_station(Some(format!("{} (demo)", crate::models::title_case(city)))))
            },
            #[cfg(test)]
            Some(Entry::Failure(error)) => Err(error.clone()),
            None => Err(AppError::NotFound(format!(
                "city '{}' is not recognized by the AQI provider",
                city
            ))),
        }
    }
}

fn key(city: &str) -> String {
    city.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
