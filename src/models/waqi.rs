//! Deserialization structures for the WAQI `feed` endpoint.
//!
//! A successful response looks like
//! `{"status":"ok","data":{"aqi":42,"city":{"name":..,"geo":[lat,lon]},"time":{..}}}`,
//! while failures keep the same envelope with `"status":"error"` and a message string
//! in `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Top-level envelope. `data` is kept as raw JSON until the status is known.
#[derive(Debug, Deserialize, Clone)]
pub struct WaqiResponse {
    pub status: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of a successful feed response. Station index, forecasts and
/// per-pollutant values are not read.
#[derive(Debug, Deserialize, Clone)]
pub struct WaqiFeed {
    /// `None` when the station reports `"-"` (no current value).
    #[serde(default, deserialize_with = "deserialize_aqi")]
    pub aqi: Option<i32>,
    pub city: Option<WaqiCity>,
    pub time: Option<WaqiTime>,
    #[serde(rename = "dominentpol")]
    pub dominant_pollutant: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WaqiCity {
    pub name: Option<String>,
    /// `[latitude, longitude]`
    #[serde(default)]
    pub geo: Vec<f64>,
}

/// Observation time; the local-time `s` and `tz` fields are ignored.
#[derive(Debug, Deserialize, Clone)]
pub struct WaqiTime {
    /// Unix timestamp of the observation.
    pub v: Option<i64>,
    pub iso: Option<String>,
}

impl WaqiTime {
    /// Observation time, preferring the ISO-8601 field over the epoch value.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.iso
            .as_deref()
            .and_then(|iso| DateTime::parse_from_rfc3339(iso).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| self.v.and_then(|v| DateTime::<Utc>::from_timestamp(v, 0)))
    }
}

/// The `aqi` field is numeric for live stations but the string `"-"` when the
/// station has no current value; some stations also send numbers as strings.
fn deserialize_aqi<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct AqiVisitor;

    impl<'de> Visitor<'de> for AqiVisitor {
        type Value = Option<i32>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an AQI number or a placeholder string")
        }

        fn visit_i64<E>(self, value: i64) -> Result<Option<i32>, E>
        where
            E: de::Error,
        {
            i32::try_from(value)
                .map(Some)
                .map_err(|_| E::custom(format!("AQI out of range: {}", value)))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Option<i32>, E>
        where
            E: de::Error,
        {
            i32::try_from(value)
                .map(Some)
                .map_err(|_| E::custom(format!("AQI out of range: {}", value)))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Option<i32>, E>
        where
            E: de::Error,
        {
            if value.is_finite() {
                Ok(Some(value.round() as i32))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E>(self, value: &str) -> Result<Option<i32>, E>
        where
            E: de::Error,
        {
            Ok(value.trim().parse::<f64>().ok().map(|v| v.round() as i32))
        }

        fn visit_unit<E>(self) -> Result<Option<i32>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(AqiVisitor)
}
