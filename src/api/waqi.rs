//! Provides a client for the World Air Quality Index (WAQI) feed API.
//!
//! This module defines the `WaqiClient` struct, which fetches the current AQI for a city
//! from `GET {base_url}/feed/{city}/?token={api_key}` and classifies provider failures
//! into the application's error taxonomy.

use super::AqiSource;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{CityAqiReading, Coordinates, WaqiFeed, WaqiResponse};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// An asynchronous client for the WAQI city feed.
pub struct WaqiClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    max_retries: u32,
    retry_backoff: Duration,
}

impl WaqiClient {
    /// Creates a new `WaqiClient` from the application configuration.
    ///
    /// The configured request timeout applies to every request.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            AppError::Config(format!("invalid WAQI base URL {}: {}", config.base_url, e))
        })?;
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    /// URL of the feed for `city`, with the city encoded as a single path segment.
    pub fn feed_url(&self, city: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Config(format!("WAQI base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .push("feed")
            .push(city)
            .push("");
        Ok(url)
    }

    /// Performs a single request without retrying.
    async fn fetch_once(&self, city: &str, api_key: &str) -> Result<CityAqiReading> {
        let url = self.feed_url(city)?;
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(url)
            .query(&[("token", api_key)])
            .send()
            .await
            .map_err(|e| {
                error!("Error fetching AQI for {}: {}", city, e);
                classify_request_error(city, &e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Error reading response body for {}: {}", city, e);
            classify_request_error(city, &e)
        })?;

        if !status.is_success() {
            error!("WAQI request for {} failed with status {}", city, status);
            return Err(classify_status(city, status));
        }

        let envelope: WaqiResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Error parsing WAQI response JSON for {}: {}", city, e);
            AppError::from(e)
        })?;

        if envelope.status != "ok" {
            let message = envelope
                .data
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| envelope.data.to_string());
            error!("WAQI returned an error for {}: {}", city, message);
            return Err(classify_provider_message(city, &message));
        }

        let feed: WaqiFeed = serde_json::from_value(envelope.data)?;
        reading_from_feed(city, feed)
    }
}

#[async_trait]
impl AqiSource for WaqiClient {
    async fn fetch(&self, city: &str) -> Result<CityAqiReading> {
        let city = city.trim();
        if city.is_empty() {
            return Err(AppError::InvalidArgument("city name must not be empty".to_string()));
        }
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::Auth(
                    "no WAQI API key configured; set WAQI_API_KEY or pass --api-key".to_string(),
                )
            })?;

        info!("Fetching AQI for {}", city);
        let mut attempt = 0;
        loop {
            match self.fetch_once(city, api_key).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Transient failure fetching {} (attempt {}/{}): {}",
                        city,
                        attempt,
                        self.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                },
                other => return other,
            }
        }
    }
}

/// Builds a reading from a successful feed payload.
fn reading_from_feed(city: &str, feed: WaqiFeed) -> Result<CityAqiReading> {
    let reported = feed.aqi.ok_or_else(|| {
        AppError::NotFound(format!("no current AQI reading available for '{}'", city))
    })?;

    let observed_at = feed
        .time
        .as_ref()
        .and_then(|t| t.observed_at())
        .unwrap_or_else(Utc::now);
    let coordinates = feed.city.as_ref().and_then(|c| match c.geo.as_slice() {
        [latitude, longitude, ..] => Some(Coordinates {
            latitude: *latitude,
            longitude: *longitude,
        }),
        _ => None,
    });
    let station = feed.city.and_then(|c| c.name);

    let reading = CityAqiReading::new(city, reported, observed_at)
        .with_coordinates(coordinates)
        .with_station(station)
        .with_dominant_pollutant(feed.dominant_pollutant);

    if reading.was_clamped() {
        warn!(
            "AQI {} for {} is outside the 0-500 scale; using {}",
            reading.reported_aqi, reading.city, reading.aqi
        );
    }
    debug!("Parsed reading for {}: AQI {}", reading.city, reading.aqi);
    Ok(reading)
}

fn classify_request_error(city: &str, err: &reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Transient(format!("request for '{}' timed out", city))
    } else if err.is_connect() || err.is_request() || err.is_body() {
        AppError::Transient(format!("could not reach the AQI provider for '{}': {}", city, err))
    } else {
        AppError::Provider(format!("request for '{}' failed: {}", city, err))
    }
}

fn classify_status(city: &str, status: StatusCode) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Auth(format!("the AQI provider rejected the API key ({})", status))
        },
        StatusCode::NOT_FOUND => AppError::NotFound(format!("no AQI data for city '{}'", city)),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            AppError::Transient(format!("the AQI provider is throttling requests ({})", status))
        },
        s if s.is_server_error() => {
            AppError::Transient(format!("the AQI provider is unavailable ({})", status))
        },
        _ => AppError::Provider(format!("unexpected status {} for '{}'", status, city)),
    }
}

/// Maps WAQI's `"status":"error"` messages onto the error taxonomy.
fn classify_provider_message(city: &str, message: &str) -> AppError {
    let lower = message.to_lowercase();
    if lower.contains("invalid key") || lower.contains("token") {
        AppError::Auth(format!("the AQI provider rejected the API key: {}", message))
    } else if lower.contains("unknown station") || lower.contains("unknown city") {
        AppError::NotFound(format!(
            "city '{}' is not recognized by the AQI provider",
            city
        ))
    } else if lower.contains("over quota") {
        AppError::Transient(format!("AQI provider quota exceeded: {}", message))
    } else {
        AppError::Provider(format!("failed to fetch AQI for '{}': {}", city, message))
    }
}
