//! Short-horizon AQI projection.
//!
//! The model is a straight line through the current value: day `i` (0-based) is
//! projected as `current * (1 + growth_rate * i)`, clamped onto the AQI scale. An
//! optional seeded perturbation can be layered on top; with a fixed seed the output
//! is fully deterministic.

use crate::error::{AppError, Result};
use crate::models::{
    CityAqiReading, PredictedDay, PredictionSeries, PredictionSummary, Trend, AQI_MAX, AQI_MIN,
};
use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

/// Longest horizon a projection may cover.
pub const MAX_PREDICTION_DAYS: i64 = 365;

/// Bounded random perturbation applied on top of the growth line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Noise {
    pub amplitude: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct Predictor {
    growth_rate: f64,
    noise: Option<Noise>,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GROWTH_RATE)
    }
}

impl Predictor {
    pub fn new(growth_rate: f64) -> Self {
        Self {
            growth_rate,
            noise: None,
        }
    }

    /// Adds a uniform perturbation in `[-amplitude, amplitude]` drawn from a seeded RNG.
    pub fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.noise = Some(Noise {
            amplitude: amplitude.abs(),
            seed,
        });
        self
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    /// Projects `days` values following `current_aqi`, dated from today.
    pub fn predict(&self, city: &str, current_aqi: i32, days: i64) -> Result<PredictionSeries> {
        self.predict_from(city, current_aqi, days, Utc::now().date_naive())
    }

    /// Projects `days` values following `current_aqi`, dated from `start`.
    pub fn predict_from(
        &self,
        city: &str,
        current_aqi: i32,
        days: i64,
        start: NaiveDate,
    ) -> Result<PredictionSeries> {
        if days <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "prediction horizon must be a positive number of days, got {}",
                days
            )));
        }
        if days > MAX_PREDICTION_DAYS {
            return Err(AppError::InvalidArgument(format!(
                "prediction horizon of {} days exceeds the maximum of {}",
                days, MAX_PREDICTION_DAYS
            )));
        }
        let horizon = u32::try_from(days).map_err(|_| {
            AppError::InvalidArgument(format!("prediction horizon too large: {}", days))
        })?;

        let mut rng = self.noise.map(|n| StdRng::seed_from_u64(n.seed));
        let current = current_aqi as f64;

        let points = (0..horizon)
            .map(|i| {
                let mut value = current * (1.0 + self.growth_rate * i as f64);
                if let (Some(noise), Some(rng)) = (self.noise, rng.as_mut()) {
                    if noise.amplitude > 0.0 {
                        value += rng.gen_range(-noise.amplitude..=noise.amplitude);
                    }
                }
                let offset = i + 1;
                let date = start
                    .checked_add_signed(Duration::days(i64::from(offset)))
                    .ok_or_else(|| {
                        AppError::InvalidArgument(format!(
                            "day {} after {} is outside the supported calendar",
                            offset, start
                        ))
                    })?;
                Ok(PredictedDay {
                    day_offset: offset,
                    date,
                    aqi: clamp_aqi(value),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Predicted {} days for {} starting from AQI {}",
            horizon, city, current_aqi
        );

        Ok(PredictionSeries {
            city: city.to_string(),
            points,
            horizon,
        })
    }

    /// Projects every reading independently, in parallel. Output order follows input order.
    pub fn predict_many(
        &self,
        readings: &[CityAqiReading],
        days: i64,
    ) -> Vec<Result<PredictionSeries>> {
        readings
            .par_iter()
            .map(|r| self.predict(&r.city, r.aqi, days))
            .collect()
    }

    /// Min, max, mean and direction of a series.
    pub fn summarize(series: &PredictionSeries) -> Result<PredictionSummary> {
        let values = series.values();
        let (first, last) = match (values.first(), values.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(AppError::InvalidArgument(format!(
                    "cannot summarize an empty prediction for {}",
                    series.city
                )))
            }
        };

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let trend = if (last - first).abs() < f64::EPSILON {
            Trend::Stable
        } else if last > first {
            Trend::Increasing
        } else {
            Trend::Decreasing
        };

        Ok(PredictionSummary {
            min,
            max,
            mean,
            trend,
        })
    }
}

fn clamp_aqi(value: f64) -> f64 {
    if value.is_nan() {
        return AQI_MIN as f64;
    }
    value.clamp(AQI_MIN as f64, AQI_MAX as f64)
}
