//! Defines the data structures and models used throughout the application.
//!
//! This includes the domain types (readings, predictions, reports) and the
//! structures representing data fetched from the WAQI API.

mod aqi;
mod waqi;

pub use aqi::*;
pub use waqi::*;
