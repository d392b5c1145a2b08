//! Provides clients and utilities for fetching AQI readings.
//!
//! Includes:
//! - `AqiSource`: the seam between the application and any reading provider.
//! - `waqi`: client for the real World Air Quality Index API.
//! - `mock`: offline provider with plausible seeded readings.

mod mock;
mod waqi;
#[cfg(test)]
mod waqi_test;

pub use mock::*;
pub use waqi::*;

use crate::error::Result;
use crate::models::CityAqiReading;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

/// Anything that can produce a current AQI reading for a city name.
#[async_trait]
pub trait AqiSource: Send + Sync {
    /// Fetches the current reading for one city.
    async fn fetch(&self, city: &str) -> Result<CityAqiReading>;

    /// Fetches several cities with at most `concurrency` requests in flight.
    ///
    /// Every city gets its own result; results come back in input order.
    async fn fetch_many(
        &self,
        cities: &[String],
        concurrency: usize,
    ) -> Vec<(String, Result<CityAqiReading>)> {
        stream::iter(cities.iter().cloned())
            .map(|city| async move {
                let result = self.fetch(&city).await;
                (city, result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
